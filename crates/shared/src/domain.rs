use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(ServiceId);
id_newtype!(JobId);
id_newtype!(VolumeId);
id_newtype!(PortId);

/// The server encodes an empty Go slice as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Which of a service's two port lists an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortSide {
    Input,
    Output,
}

impl PortSide {
    pub fn from_is_input(is_input: bool) -> Self {
        if is_input {
            Self::Input
        } else {
            Self::Output
        }
    }

    /// Prefix used for locally assigned port identifiers.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Port {
    #[serde(rename = "ID", default)]
    pub id: PortId,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Path", default)]
    pub path: String,
}

/// A manageable service exposing named input and output ports.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "ID", default)]
    pub id: ServiceId,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "Created", default)]
    pub created: String,
    #[serde(rename = "ImageID", default)]
    pub image_id: String,
    #[serde(rename = "RepoTag", default)]
    pub repo_tag: String,
    #[serde(rename = "Size", default)]
    pub size: i64,
    #[serde(rename = "Input", default, deserialize_with = "null_as_empty")]
    pub input: Vec<Port>,
    #[serde(rename = "Output", default, deserialize_with = "null_as_empty")]
    pub output: Vec<Port>,
}

impl Service {
    pub fn ports(&self, side: PortSide) -> &[Port] {
        match side {
            PortSide::Input => &self.input,
            PortSide::Output => &self.output,
        }
    }

    pub fn port_count(&self) -> usize {
        self.input.len() + self.output.len()
    }
}

/// Server wrapper around a single service. Sibling keys (image metadata and
/// the like) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceEnvelope {
    #[serde(rename = "Service")]
    pub service: Service,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Service> for ServiceEnvelope {
    fn from(service: Service) -> Self {
        Self {
            service,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "ID", default)]
    pub id: JobId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Volume {
    #[serde(rename = "ID", default)]
    pub id: VolumeId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Email", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_accepts_null_port_lists() {
        let service: Service = serde_json::from_value(serde_json::json!({
            "ID": "svc-1",
            "Name": "demo",
            "Input": null,
            "Output": [{"ID": "output0", "Name": "out", "Path": "/out"}]
        }))
        .expect("decode service");

        assert!(service.input.is_empty());
        assert_eq!(service.output.len(), 1);
        assert_eq!(service.output[0].id, PortId::from("output0"));
        assert_eq!(service.port_count(), 1);
    }

    #[test]
    fn envelope_keeps_unknown_keys() {
        let raw = serde_json::json!({
            "Service": {"ID": "svc-1", "Name": "demo"},
            "Image": {"Tag": "latest"}
        });
        let envelope: ServiceEnvelope = serde_json::from_value(raw.clone()).expect("decode");
        assert_eq!(envelope.service.id.as_str(), "svc-1");
        assert_eq!(envelope.extra.get("Image"), raw.get("Image"));
    }

    #[test]
    fn service_serializes_with_server_field_names() {
        let service = Service {
            id: ServiceId::from("svc-1"),
            image_id: "sha256:abc".into(),
            ..Service::default()
        };
        let value = serde_json::to_value(&service).expect("encode");
        assert_eq!(value["ID"], "svc-1");
        assert_eq!(value["ImageID"], "sha256:abc");
        assert_eq!(value["Input"], serde_json::json!([]));
    }
}
