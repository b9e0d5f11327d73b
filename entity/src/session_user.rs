use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Employee,
    Hr,
    Director,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Employee, Role::Hr, Role::Director];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Hr => "hr",
            Role::Director => "director",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Employee => "Employee",
            Role::Hr => "HR",
            Role::Director => "Director",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "employee" => Some(Role::Employee),
            "hr" => Some(Role::Hr),
            "director" => Some(Role::Director),
            _ => None,
        }
    }
}

/// The signed-in actor. Lives as long as the session that carries it.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct SessionUser {
    pub name: String,
    pub role: Role,
    pub provider: Option<String>,
}

impl SessionUser {
    pub fn local(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
            provider: None,
        }
    }

    /// Provider sign-ins carry no username, only the selected role.
    pub fn via_provider(provider: impl Into<String>, role: Role) -> Self {
        Self {
            name: format!("{} User", role.label()),
            role,
            provider: Some(provider.into()),
        }
    }
}
