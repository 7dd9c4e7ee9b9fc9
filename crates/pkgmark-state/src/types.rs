use crate::MarkError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReceipt {
    pub name: String,
    pub version: String,
    pub dependencies: Vec<String>,
    pub installed_on_request: bool,
    pub installed_as_dependency: bool,
    pub installed_at_unix: u64,
    /// Receipt lines this crate does not interpret, kept in file order.
    pub extra: Vec<(String, String)>,
}

/// Requested provenance changes. `None` leaves the flag untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkIntent {
    on_request: Option<bool>,
    as_dependency: Option<bool>,
}

impl MarkIntent {
    pub fn new(on_request: Option<bool>, as_dependency: Option<bool>) -> Result<Self, MarkError> {
        if on_request.is_none() && as_dependency.is_none() {
            return Err(MarkError::Usage("no marking option specified".to_string()));
        }
        Ok(Self {
            on_request,
            as_dependency,
        })
    }

    pub fn on_request(&self) -> Option<bool> {
        self.on_request
    }

    pub fn as_dependency(&self) -> Option<bool> {
        self.as_dependency
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkFlag {
    OnRequest,
    AsDependency,
}

impl MarkFlag {
    pub(crate) fn label(self, value: bool) -> String {
        let negation = if value { "" } else { "not " };
        match self {
            Self::OnRequest => format!("{negation}installed on request"),
            Self::AsDependency => format!("{negation}installed as dependency"),
        }
    }

    pub(crate) fn receipt_key(self) -> &'static str {
        match self {
            Self::OnRequest => "installed_on_request",
            Self::AsDependency => "installed_as_dependency",
        }
    }

    pub(crate) fn current(self, receipt: &InstallReceipt) -> bool {
        match self {
            Self::OnRequest => receipt.installed_on_request,
            Self::AsDependency => receipt.installed_as_dependency,
        }
    }

    pub(crate) fn assign(self, receipt: &mut InstallReceipt, value: bool) {
        match self {
            Self::OnRequest => receipt.installed_on_request = value,
            Self::AsDependency => receipt.installed_as_dependency = value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkOutcome {
    pub name: String,
    pub unchanged: Vec<String>,
    pub changed: Vec<String>,
}

impl MarkOutcome {
    pub fn wrote_receipt(&self) -> bool {
        !self.changed.is_empty()
    }
}
