//! Call-log and SMS records
//!
//! Records are immutable snapshots deserialized from the backend. The backend
//! labels its columns in Russian; English camelCase keys are accepted as
//! aliases. Serializing a record writes the backend's own keys back, so a
//! filtered list can be posted to the report endpoint unchanged.
//!
//! ## Call log wire format
//!
//! ```json
//! {
//!     "ID звонка": "412",
//!     "Номер": "+7 900 555-12-34",
//!     "Контакт": "Anna",
//!     "Длительность": "00:02:41",
//!     "Страна": "RU",
//!     "Тип вызова": "Входящий",
//!     "Дата": "2024-03-15 14:22:10",
//!     "Новый вызов": "0",
//!     "Пропущенный": "0",
//!     "SIM-карта (ID)": "1",
//!     "Причина блокировки": "",
//!     "Учётная запись телефона": "com.android.phone"
//! }
//! ```

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Fields the filter engine looks at
///
/// Implemented by every record kind shown in a paginated table.
pub trait LogRecord {
    /// Phone number, matched literally (no normalisation)
    fn phone_number(&self) -> &str;

    /// Secondary searchable text: contact name for calls, body for SMS
    fn search_text(&self) -> Option<&str>;

    /// Raw timestamp as sent by the backend
    fn timestamp(&self) -> &str;
}

/// Direction of a call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CallType {
    Incoming,
    Outgoing,
    Missed,
    /// Any other label (rejected, blocked, voicemail...), kept verbatim
    Other(String),
    #[default]
    Unknown,
}

impl CallType {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Входящий" | "incoming" | "Incoming" => Self::Incoming,
            "Исходящий" | "outgoing" | "Outgoing" => Self::Outgoing,
            "Пропущенный" | "missed" | "Missed" => Self::Missed,
            "" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    /// Label in the backend's vocabulary
    pub fn wire_label(&self) -> &str {
        match self {
            Self::Incoming => "Входящий",
            Self::Outgoing => "Исходящий",
            Self::Missed => "Пропущенный",
            Self::Other(label) => label,
            Self::Unknown => "",
        }
    }

    /// Label for display
    pub fn display_label(&self) -> &str {
        match self {
            Self::Incoming => "Incoming",
            Self::Outgoing => "Outgoing",
            Self::Missed => "Missed",
            Self::Other(label) => label,
            Self::Unknown => "Unknown",
        }
    }
}

impl Serialize for CallType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_label())
    }
}

impl<'de> Deserialize<'de> for CallType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = lenient_string(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

/// Direction of an SMS
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MessageType {
    Incoming,
    Outgoing,
    Other(String),
    #[default]
    Unknown,
}

impl MessageType {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Входящее" | "incoming" | "Incoming" => Self::Incoming,
            "Исходящее" | "outgoing" | "Outgoing" => Self::Outgoing,
            "" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn wire_label(&self) -> &str {
        match self {
            Self::Incoming => "Входящее",
            Self::Outgoing => "Исходящее",
            Self::Other(label) => label,
            Self::Unknown => "",
        }
    }

    pub fn display_label(&self) -> &str {
        match self {
            Self::Incoming => "Incoming",
            Self::Outgoing => "Outgoing",
            Self::Other(label) => label,
            Self::Unknown => "Unknown",
        }
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_label())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = lenient_string(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

/// One call-log entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallLogRecord {
    #[serde(rename = "ID звонка", alias = "id", default, deserialize_with = "lenient_string")]
    pub id: String,

    #[serde(rename = "Номер", alias = "phoneNumber", default, deserialize_with = "lenient_string")]
    pub phone_number: String,

    /// Contact name from the phone's address book
    #[serde(rename = "Контакт", alias = "contactName", default, deserialize_with = "optional_string")]
    pub contact_name: Option<String>,

    /// Duration preformatted by the backend
    #[serde(rename = "Длительность", alias = "durationDisplay", default, deserialize_with = "lenient_string")]
    pub duration_display: String,

    #[serde(rename = "Страна", alias = "country", default, deserialize_with = "lenient_string")]
    pub country: String,

    #[serde(rename = "Тип вызова", alias = "callType", default)]
    pub call_type: CallType,

    #[serde(rename = "Дата", alias = "timestamp", default, deserialize_with = "lenient_string")]
    pub timestamp: String,

    #[serde(rename = "Новый вызов", alias = "isNew", default, deserialize_with = "lenient_string")]
    pub is_new: String,

    #[serde(rename = "Пропущенный", alias = "isMissed", default, deserialize_with = "lenient_string")]
    pub is_missed: String,

    #[serde(rename = "SIM-карта (ID)", alias = "simId", default, deserialize_with = "lenient_string")]
    pub sim_id: String,

    #[serde(rename = "Причина блокировки", alias = "blockReason", default, deserialize_with = "lenient_string")]
    pub block_reason: String,

    #[serde(rename = "Учётная запись телефона", alias = "phoneAccount", default, deserialize_with = "lenient_string")]
    pub phone_account: String,
}

impl CallLogRecord {
    /// Whether the call is flagged as new (unseen)
    pub fn is_new(&self) -> bool {
        flag_value(&self.is_new)
    }

    /// Whether the call is flagged as missed, either by flag or by type
    pub fn is_missed(&self) -> bool {
        flag_value(&self.is_missed) || self.call_type == CallType::Missed
    }

    /// Contact name, or the number when no contact is known
    pub fn display_name(&self) -> &str {
        self.contact_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.phone_number)
    }
}

impl LogRecord for CallLogRecord {
    fn phone_number(&self) -> &str {
        &self.phone_number
    }

    fn search_text(&self) -> Option<&str> {
        self.contact_name.as_deref()
    }

    fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// One SMS entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SmsRecord {
    #[serde(rename = "ID", alias = "id", default, deserialize_with = "lenient_string")]
    pub id: String,

    #[serde(rename = "Номер", alias = "phoneNumber", default, deserialize_with = "lenient_string")]
    pub phone_number: String,

    #[serde(rename = "Текст", alias = "text", default, deserialize_with = "lenient_string")]
    pub text: String,

    #[serde(rename = "Дата", alias = "timestamp", default, deserialize_with = "lenient_string")]
    pub timestamp: String,

    #[serde(rename = "Тип", alias = "messageType", default)]
    pub message_type: MessageType,
}

impl LogRecord for SmsRecord {
    fn phone_number(&self) -> &str {
        &self.phone_number
    }

    fn search_text(&self) -> Option<&str> {
        Some(&self.text)
    }

    fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// Interpret the backend's assorted truthy spellings
fn flag_value(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "да"
    )
}

/// Accept strings, numbers, booleans and null as a string field
pub(crate) fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn optional_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = lenient_string(deserializer)?;
    Ok(if value.is_empty() { None } else { Some(value) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_log_from_backend_keys() {
        let value = json!({
            "ID звонка": 412,
            "Номер": "+7 900 555-12-34",
            "Контакт": "Anna",
            "Длительность": "00:02:41",
            "Страна": "RU",
            "Тип вызова": "Входящий",
            "Дата": "2024-03-15 14:22:10",
            "Новый вызов": "1",
            "Пропущенный": "0",
            "SIM-карта (ID)": "1",
            "Причина блокировки": null,
            "Учётная запись телефона": "com.android.phone"
        });

        let record: CallLogRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.id, "412");
        assert_eq!(record.contact_name.as_deref(), Some("Anna"));
        assert_eq!(record.call_type, CallType::Incoming);
        assert!(record.is_new());
        assert!(!record.is_missed());
        assert_eq!(record.block_reason, "");
    }

    #[test]
    fn test_call_log_english_aliases() {
        let value = json!({
            "id": "1",
            "phoneNumber": "555-0100",
            "callType": "Missed",
            "timestamp": "2024-03-15 08:00:00"
        });

        let record: CallLogRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.phone_number, "555-0100");
        assert_eq!(record.call_type, CallType::Missed);
        assert!(record.is_missed());
        assert!(record.contact_name.is_none());
        assert_eq!(record.display_name(), "555-0100");
    }

    #[test]
    fn test_call_log_serializes_backend_keys() {
        let record = CallLogRecord {
            phone_number: "555".to_string(),
            call_type: CallType::Outgoing,
            ..Default::default()
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["Номер"], "555");
        assert_eq!(value["Тип вызова"], "Исходящий");
    }

    #[test]
    fn test_unknown_call_type_kept_verbatim() {
        assert_eq!(
            CallType::from_label("Отклонённый"),
            CallType::Other("Отклонённый".to_string())
        );
        assert_eq!(CallType::from_label("Отклонённый").wire_label(), "Отклонённый");
        assert_eq!(CallType::from_label("").display_label(), "Unknown");
    }

    #[test]
    fn test_sms_from_backend_keys() {
        let value = json!({
            "ID": "77",
            "Номер": "900",
            "Текст": "Your code is 1234",
            "Дата": "2024-03-15 09:00:00",
            "Тип": "Исходящее"
        });

        let record: SmsRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.message_type, MessageType::Outgoing);
        assert_eq!(record.search_text(), Some("Your code is 1234"));
        assert_eq!(record.message_type.display_label(), "Outgoing");
    }
}
