//! Pure record builders for service edits.
//!
//! Every mutation produces a full replacement record: immutable fields are
//! copied from the current service and only the edited fields change.

use shared::domain::{Port, PortId, PortSide, Service};

use crate::{store::ServiceEditForm, ValidationError};

/// Values for a port that has not been persisted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortDraft {
    pub name: Option<String>,
    pub path: Option<String>,
}

impl PortDraft {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            path: Some(path.into()),
        }
    }

    /// Absent and empty values count as blank.
    pub fn is_blank(&self) -> bool {
        is_blank(&self.name) && is_blank(&self.path)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn edited_or(value: &Option<String>, current: &str) -> String {
    value.clone().unwrap_or_else(|| current.to_string())
}

/// Applies the metadata fields of the edit form onto `current`.
///
/// Only `Name`, `Description` and `Version` are taken from the form; a field
/// the form leaves unset keeps the current value.
pub fn service_update_record(current: &Service, form: &ServiceEditForm) -> Service {
    Service {
        name: edited_or(&form.service_name, &current.name),
        description: edited_or(&form.service_description, &current.description),
        version: edited_or(&form.service_version, &current.version),
        ..current.clone()
    }
}

/// Picks `"{prefix}{n}"` starting at `n = ports.len()`, skipping numbers that
/// are already taken on this side.
pub fn next_port_id(ports: &[Port], side: PortSide) -> PortId {
    let prefix = side.id_prefix();
    (ports.len()..)
        .map(|n| PortId(format!("{prefix}{n}")))
        .find(|candidate| ports.iter().all(|port| &port.id != candidate))
        .unwrap_or_default()
}

pub fn with_port_added(
    current: &Service,
    side: PortSide,
    draft: &PortDraft,
) -> Result<Service, ValidationError> {
    if draft.is_blank() {
        return Err(ValidationError::EmptyPort { side });
    }

    let mut record = current.clone();
    let ports = match side {
        PortSide::Input => &mut record.input,
        PortSide::Output => &mut record.output,
    };
    let id = next_port_id(ports, side);
    ports.push(Port {
        id,
        name: draft.name.clone().unwrap_or_default(),
        path: draft.path.clone().unwrap_or_default(),
    });
    Ok(record)
}

/// Drops exactly the port at `index`; an out-of-range index leaves the list as is.
pub fn with_port_removed(current: &Service, side: PortSide, index: usize) -> Service {
    let mut record = current.clone();
    let ports = match side {
        PortSide::Input => &mut record.input,
        PortSide::Output => &mut record.output,
    };
    if index < ports.len() {
        ports.remove(index);
    }
    record
}

/// Swaps in `updated` wherever the ID matches, keeping the list order.
pub fn replace_in_collection(services: &[Service], updated: &Service) -> Vec<Service> {
    services
        .iter()
        .map(|service| {
            if service.id == updated.id {
                updated.clone()
            } else {
                service.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::ServiceId;

    fn port(id: &str, name: &str, path: &str) -> Port {
        Port {
            id: PortId::from(id),
            name: name.into(),
            path: path.into(),
        }
    }

    fn service(id: &str) -> Service {
        Service {
            id: ServiceId::from(id),
            name: "old".into(),
            description: "before".into(),
            version: "1".into(),
            created: "2016-08-18T10:00:00Z".into(),
            image_id: "sha256:abc".into(),
            repo_tag: "gef/demo:latest".into(),
            size: 4096,
            input: Vec::new(),
            output: Vec::new(),
        }
    }

    #[test]
    fn update_record_overwrites_only_edited_fields() {
        let current = service("a");
        let form = ServiceEditForm {
            service_name: Some("new".into()),
            service_version: Some("1".into()),
            service_description: Some("d".into()),
            ..ServiceEditForm::default()
        };

        let record = service_update_record(&current, &form);

        assert_eq!(record.name, "new");
        assert_eq!(record.description, "d");
        assert_eq!(record.version, "1");
        assert_eq!(record.id, current.id);
        assert_eq!(record.created, current.created);
        assert_eq!(record.image_id, current.image_id);
        assert_eq!(record.repo_tag, current.repo_tag);
        assert_eq!(record.size, current.size);
    }

    #[test]
    fn update_record_keeps_fields_the_form_leaves_unset() {
        let current = service("a");
        let form = ServiceEditForm {
            service_name: Some("renamed".into()),
            ..ServiceEditForm::default()
        };

        let record = service_update_record(&current, &form);
        assert_eq!(record.name, "renamed");
        assert_eq!(record.description, "before");
        assert_eq!(record.version, "1");
    }

    #[test]
    fn adding_input_appends_after_existing_ports() {
        let mut current = service("a");
        current.input = vec![port("input0", "first", "/in/first")];

        let record = with_port_added(
            &current,
            PortSide::Input,
            &PortDraft {
                name: Some("x".into()),
                path: None,
            },
        )
        .expect("valid draft");

        assert_eq!(record.input.len(), 2);
        assert_eq!(record.input[0], current.input[0]);
        assert_eq!(record.input[1], port("input1", "x", ""));
        assert!(record.output.is_empty());
    }

    #[test]
    fn blank_draft_is_rejected() {
        let current = service("a");
        let draft = PortDraft {
            name: Some(String::new()),
            path: None,
        };
        let err = with_port_added(&current, PortSide::Output, &draft).expect_err("blank");
        assert_eq!(
            err,
            ValidationError::EmptyPort {
                side: PortSide::Output
            }
        );
        assert_eq!(err.to_string(), "Output name and path cannot be empty");
    }

    #[test]
    fn next_port_id_skips_identifiers_left_by_removals() {
        let ports = vec![port("output0", "a", "/a"), port("output2", "c", "/c")];
        assert_eq!(next_port_id(&ports, PortSide::Output), PortId::from("output3"));
        assert_eq!(next_port_id(&[], PortSide::Input), PortId::from("input0"));
    }

    #[test]
    fn removing_middle_port_preserves_neighbours() {
        let mut current = service("a");
        current.input = vec![port("input0", "in", "/in")];
        current.output = vec![
            port("output0", "p0", "/p0"),
            port("output1", "p1", "/p1"),
            port("output2", "p2", "/p2"),
        ];

        let record = with_port_removed(&current, PortSide::Output, 1);

        assert_eq!(
            record.output,
            vec![current.output[0].clone(), current.output[2].clone()]
        );
        assert_eq!(record.input, current.input);
    }

    #[test]
    fn removing_out_of_range_index_is_a_no_op() {
        let mut current = service("a");
        current.input = vec![port("input0", "in", "/in")];
        let record = with_port_removed(&current, PortSide::Input, 5);
        assert_eq!(record, current);
    }

    #[test]
    fn collection_replace_swaps_only_matching_id() {
        let first = service("1");
        let second = service("2");
        let mut updated = service("2");
        updated.name = "fresh".into();

        let services = replace_in_collection(&[first.clone(), second], &updated);

        assert_eq!(services, vec![first, updated]);
    }
}
