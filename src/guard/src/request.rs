/*
   Directory uniqueness guard
   Copyright (C) David Mulder <dmulder@samba.org> 2024

   This program is free software; you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation; either version 3 of the License, or
   (at your option) any later version.

   This program is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Modify,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add => f.write_str("add"),
            Operation::Modify => f.write_str("modify"),
        }
    }
}

/// A request control attached out-of-band by the directory engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Control {
    pub oid: String,
    #[serde(default)]
    pub critical: bool,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<Vec<u8>>,
}

// Attribute values may carry credentials, so only the shape is printed.
impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("values", &self.values.len())
            .finish()
    }
}

/// A proposed add or modify as received from the directory engine. The
/// guard only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub operation: Operation,
    pub dn: Option<String>,
    pub object_classes: Vec<String>,
    pub attributes: Vec<Attribute>,
    pub controls: Vec<Control>,
}

impl WriteRequest {
    pub fn new(operation: Operation) -> Self {
        WriteRequest {
            operation,
            dn: None,
            object_classes: vec![],
            attributes: vec![],
            controls: vec![],
        }
    }

    pub fn with_dn(mut self, dn: &str) -> Self {
        self.dn = Some(dn.to_string());
        self
    }

    pub fn with_object_class(mut self, class: &str) -> Self {
        self.object_classes.push(class.to_string());
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &[u8]) -> Self {
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(attr) => attr.values.push(value.to_vec()),
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                values: vec![value.to_vec()],
            }),
        }
        self
    }

    pub fn with_control(mut self, oid: &str) -> Self {
        self.controls.push(Control {
            oid: oid.to_string(),
            critical: false,
        });
        self
    }

    /// Attribute descriptions are case-insensitive.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// The first value of an attribute, if it has one.
    pub fn first_value(&self, name: &str) -> Option<&[u8]> {
        self.attribute(name)
            .and_then(|a| a.values.first())
            .map(|v| v.as_slice())
    }

    pub fn has_object_class(&self, class: &str) -> bool {
        self.object_classes
            .iter()
            .any(|c| c.eq_ignore_ascii_case(class))
    }

    /// True when a trusted caller attached the bypass control.
    pub fn is_bypassed(&self, bypass_oid: &str) -> bool {
        self.controls.iter().any(|c| c.oid == bypass_oid)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DocumentValue {
    Text(String),
    Binary { base64: String },
}

/// JSON shape of a write request as handed over by a host adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestDocument {
    pub operation: Operation,
    #[serde(default)]
    pub dn: Option<String>,
    #[serde(default)]
    pub object_classes: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<DocumentValue>>,
    #[serde(default)]
    pub controls: Vec<Control>,
}

impl RequestDocument {
    pub fn from_json(data: &str) -> Result<Self, String> {
        serde_json::from_str(data).map_err(|e| format!("invalid request document: {}", e))
    }

    pub fn into_request(self) -> Result<WriteRequest, String> {
        let mut object_classes = self.object_classes;
        let mut attributes = Vec::with_capacity(self.attributes.len());
        for (name, values) in self.attributes {
            let mut raw = Vec::with_capacity(values.len());
            for value in values {
                match value {
                    DocumentValue::Text(s) => raw.push(s.into_bytes()),
                    DocumentValue::Binary { base64 } => {
                        let bytes = STANDARD.decode(base64.as_bytes()).map_err(|e| {
                            format!("attribute {} has an invalid base64 value: {}", name, e)
                        })?;
                        raw.push(bytes);
                    }
                }
            }
            // objectClass may arrive either way; fold it into the class list.
            if name.eq_ignore_ascii_case("objectClass") {
                for v in &raw {
                    object_classes.push(String::from_utf8_lossy(v).to_string());
                }
            }
            attributes.push(Attribute { name, values: raw });
        }
        Ok(WriteRequest {
            operation: self.operation,
            dn: self.dn,
            object_classes,
            attributes,
            controls: self.controls,
        })
    }
}
