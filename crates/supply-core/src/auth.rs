//! Role-gated demo login. Not a security mechanism: one shared, hard-coded
//! password per role, compared in plain text.

use crate::Role;

pub trait CredentialCheck: Send + Sync {
    fn accepts(&self, role: Role, password: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DemoCredentials;

impl DemoCredentials {
    fn password_for(role: Role) -> &'static str {
        match role {
            Role::Manufacturer => "mfg123",
            Role::Distributor => "dist123",
            Role::Retailer => "ret123",
        }
    }
}

impl CredentialCheck for DemoCredentials {
    fn accepts(&self, role: Role, password: &str) -> bool {
        Self::password_for(role) == password
    }
}
