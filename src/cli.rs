/// Conference management backend.
#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
pub(crate) struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Default)]
pub(crate) enum Command {
    /// Runs the server (default)
    #[default]
    Run,
    /// Resets the database
    Reset,
    /// Migrates the database to the latest schema
    Migrate,
    /// Creates a user account
    CreateUser {
        email: String,
        first_name: String,
        last_name: String,
        /// admin, editor, contributor, speaker, presenter, volunteer, reviewer
        role: String,
    },
    /// Issues a login token for an existing user
    GrantToken { email: String },
}
