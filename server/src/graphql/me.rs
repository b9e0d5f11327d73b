use async_graphql::SimpleObject;

use crate::portal::RequestSession;

const NAV: &[(&str, &str)] = &[
    ("/list", "Dashboard"),
    ("/analytics", "Analytics"),
    ("/photo-result", "Photo"),
];

#[derive(Clone, Debug, SimpleObject)]
pub struct NavItem {
    pub to: String,
    pub label: String,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct MePayload {
    pub name: String,
    pub role: String,
    pub role_label: String,
    pub provider: Option<String>,
    pub nav: Vec<NavItem>,
}

impl MePayload {
    pub fn from_session(session: &RequestSession) -> Self {
        let user = &session.user;
        Self {
            name: user.name.clone(),
            role: user.role.as_str().to_string(),
            role_label: user.role.label().to_string(),
            provider: user.provider.clone(),
            nav: NAV
                .iter()
                .map(|(to, label)| NavItem {
                    to: (*to).to_string(),
                    label: (*label).to_string(),
                })
                .collect(),
        }
    }
}
