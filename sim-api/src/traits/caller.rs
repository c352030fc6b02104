/// Capability interface a transport provides for the issuer of a
/// command. The core only ever needs a stable id and a display name;
/// sending the rendered response stays on the transport side.
pub trait Caller {
    fn account_id(&self) -> i64;
    fn display_name(&self) -> &str;
}

/// Plain-value caller for tests and the stdin transport.
#[derive(Debug, Clone)]
pub struct Identity {
    pub account_id: i64,
    pub name: String,
}

impl Identity {
    pub fn new(account_id: i64, name: impl Into<String>) -> Self {
        Self {
            account_id,
            name: name.into(),
        }
    }
}

impl Caller for Identity {
    fn account_id(&self) -> i64 {
        self.account_id
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}
