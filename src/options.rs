//! Connection parameters (`MapiConnectOptions`), in the builder-style shape
//! of the teacher's `mssql/options/mod.rs::MssqlConnectOptions` — minus any
//! DSN/URL parsing, which belongs to the out-of-scope facade layer.

/// Endpoint and credential parameters for a MAPI session.
///
/// Constructed with [`MapiConnectOptions::new`] (or [`Default::default`])
/// and customized with the fluent `with_*` setters. There is no
/// `FromStr`/URL-parsing entry point in this crate; a DSN parser, if one is
/// wanted, belongs above this core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapiConnectOptions {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) database: String,
    pub(crate) language: String,
}

impl MapiConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// There is no silent empty default here, unlike the DSN regex in the
    /// original source that accepts a bare `"localhost"` with no database
    /// (see SPEC_FULL.md §9): an absent database is a caller error, surfaced
    /// whenever `Session::connect` is called with `database` left empty.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

impl Default for MapiConnectOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 50000,
            username: String::new(),
            password: String::new(),
            database: String::new(),
            language: "sql".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_defaults() {
        let opts = MapiConnectOptions::default();
        assert_eq!(opts.host, "localhost");
        assert_eq!(opts.port, 50000);
        assert_eq!(opts.language, "sql");
        assert_eq!(opts.database, "");
    }

    #[test]
    fn fluent_setters_compose() {
        let opts = MapiConnectOptions::new()
            .with_host("db.example.com")
            .with_port(50001)
            .with_username("monetdb")
            .with_password("monetdb")
            .with_database("demo")
            .with_language("sql");

        assert_eq!(opts.host, "db.example.com");
        assert_eq!(opts.port, 50001);
        assert_eq!(opts.username, "monetdb");
        assert_eq!(opts.password, "monetdb");
        assert_eq!(opts.database, "demo");
        assert_eq!(opts.language, "sql");
    }
}
