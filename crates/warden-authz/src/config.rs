//! Authorization-layer configuration.

/// Configuration for account provisioning and boundary classification.
#[derive(Debug, Clone)]
pub struct AuthzConfig {
    /// Name of the role auto-assigned at registration.
    pub default_role_name: String,
    /// Description used when the default role has to be created.
    pub default_role_description: String,
    /// Path prefix identifying API-style requests at the HTTP boundary.
    pub api_path_prefix: String,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            default_role_name: "User".into(),
            default_role_description: "Regular user with basic profile access".into(),
            api_path_prefix: "/rbac/api/".into(),
        }
    }
}
