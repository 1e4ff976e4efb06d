use scmv_config::Config;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonCodecConfig {
    /// Pretty print encoded messages
    pub pretty: bool,
    /// Keep `null` fields when encoding
    pub explicit_nulls: bool,
}

/// Shared JSON codec for server messages
#[derive(Debug, Clone)]
pub struct JsonCodec {
    config: JsonCodecConfig,
}

impl JsonCodec {
    pub fn new(config: JsonCodecConfig) -> Self {
        Self { config }
    }

    pub fn provide(config: Config<JsonCodecConfig>) -> Self {
        Self::new(JsonCodecConfig::clone(&config))
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(value)?;
        if !self.config.explicit_nulls {
            strip_nulls(&mut value);
        }

        if self.config.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        }
    }

    /// Unknown fields are ignored
    pub fn decode<T: DeserializeOwned>(&self, message: &str) -> Result<T, serde_json::Error> {
        serde_json::from_str(message)
    }
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, field| !field.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Request {
        name: String,
        uid: Option<i64>,
    }

    #[test]
    fn it_drops_null_fields_by_default() {
        let codec = JsonCodec::new(JsonCodecConfig::default());

        let encoded = codec
            .encode(&Request {
                name: "login".into(),
                uid: None,
            })
            .unwrap();

        assert_eq!(encoded, r#"{"name":"login"}"#);
    }

    #[test]
    fn it_keeps_nulls_when_configured() {
        let codec = JsonCodec::new(JsonCodecConfig {
            explicit_nulls: true,
            ..Default::default()
        });

        let encoded = codec
            .encode(&Request {
                name: "login".into(),
                uid: None,
            })
            .unwrap();

        assert_eq!(encoded, r#"{"name":"login","uid":null}"#);
    }

    #[test]
    fn it_ignores_unknown_fields() {
        let codec = JsonCodec::new(JsonCodecConfig::default());

        let decoded: Request = codec
            .decode(r#"{"name":"login","uid":3,"msg":"ok"}"#)
            .unwrap();

        assert_eq!(
            decoded,
            Request {
                name: "login".into(),
                uid: Some(3),
            }
        );
    }
}
