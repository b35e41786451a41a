//! Capability flags granted to the current user.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorities {
    read_mapping: bool,
    write_mapping: bool,
    read_flow: bool,
    write_flow: bool,
    read_step_definition: bool,
    write_step_definition: bool,
}

impl Authorities {
    /// Build from authority names such as `readMapping` or `writeMapping`.
    /// Unknown names are ignored. A write authority implies the matching
    /// read authority.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut authorities = Self::default();
        for name in names {
            match name.as_ref() {
                "readMapping" => authorities.read_mapping = true,
                "writeMapping" => {
                    authorities.read_mapping = true;
                    authorities.write_mapping = true;
                }
                "readFlow" => authorities.read_flow = true,
                "writeFlow" => {
                    authorities.read_flow = true;
                    authorities.write_flow = true;
                }
                "readStepDefinition" => authorities.read_step_definition = true,
                "writeStepDefinition" => {
                    authorities.read_step_definition = true;
                    authorities.write_step_definition = true;
                }
                _ => {}
            }
        }
        authorities
    }

    pub fn all() -> Self {
        Self::from_names(["writeMapping", "writeFlow", "writeStepDefinition"])
    }

    pub fn can_read_mapping(&self) -> bool {
        self.read_mapping
    }

    pub fn can_write_mapping(&self) -> bool {
        self.write_mapping
    }

    pub fn can_read_flow(&self) -> bool {
        self.read_flow
    }

    pub fn can_write_flow(&self) -> bool {
        self.write_flow
    }

    pub fn can_read_step_definition(&self) -> bool {
        self.read_step_definition
    }

    pub fn can_write_step_definition(&self) -> bool {
        self.write_step_definition
    }
}
