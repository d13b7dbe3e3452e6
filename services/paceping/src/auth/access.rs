//! Flat role allow-list for gated commands.
//!
//! # Purpose and responsibility
//! Decides whether a caller may create, remove, or ping paces.
//!
//! # Key invariants and assumptions
//! - A caller is allowed iff one of their role names matches `owner`, `modo`,
//!   or the configured elevated role, ignoring case.
//! - There is no hierarchy and no per-pace ownership; every gated command
//!   shares the same list.
//!
//! # Security considerations
//! - Role *names* are compared, so anyone able to rename roles in the guild
//!   can grant access. Role names are resolved from the platform, never taken
//!   from user input.

/// Roles that are always allowed, in lowercase.
pub const BUILTIN_ELEVATED_ROLES: [&str; 2] = ["owner", "modo"];

#[derive(Debug, Clone)]
pub struct AccessGuard {
    allowed: Vec<String>,
}

impl AccessGuard {
    /// Build a guard allowing the built-in roles plus `elevated_role`.
    ///
    /// # Example
    /// ```rust
    /// use paceping::auth::access::AccessGuard;
    ///
    /// let guard = AccessGuard::new("PacePingBoss");
    /// assert!(guard.allows(&["pacepingboss"]));
    /// assert!(!guard.allows(&["member"]));
    /// ```
    pub fn new(elevated_role: &str) -> Self {
        let mut allowed: Vec<String> = BUILTIN_ELEVATED_ROLES
            .iter()
            .map(|role| role.to_string())
            .collect();
        let elevated = elevated_role.trim().to_lowercase();
        if !elevated.is_empty() && !allowed.contains(&elevated) {
            allowed.push(elevated);
        }
        Self { allowed }
    }

    pub fn allows<S: AsRef<str>>(&self, role_names: &[S]) -> bool {
        role_names.iter().any(|role| {
            let role = role.as_ref().to_lowercase();
            self.allowed.iter().any(|allowed| *allowed == role)
        })
    }

    pub fn allowed_roles(&self) -> &[String] {
        &self.allowed
    }
}
