use clap::Parser;

#[derive(Parser, Debug)]
#[clap(name = "rwamp", version, about = "rwamp Command Line Utility")]
pub struct Cli {
  /// Router endpoint, e.g. tcp://127.0.0.1:8080
  #[clap(long, env = "RWAMP_URL", default_value = "tcp://127.0.0.1:8080", global = true)]
  pub url: String,

  /// Realm to join
  #[clap(long, env = "RWAMP_REALM", default_value = "realm1", global = true)]
  pub realm: String,

  /// Timeout in seconds for the handshake and for each request
  #[clap(long, default_value_t = 5, global = true)]
  pub timeout: u64,

  #[clap(subcommand)]
  pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
  /// Call a procedure and print its result
  Call(CallArgs),
  /// Publish an event to a topic
  Publish(PublishArgs),
  /// Subscribe to a topic and print incoming events
  Subscribe(SubscribeArgs),
  /// Inspect the router's registrations
  #[clap(subcommand)]
  Registrations(RegistrationsSubcommands),
}

#[derive(Parser, Debug)]
pub struct CallArgs {
  /// Procedure URI
  pub procedure: String,

  /// Positional arguments, each parsed as JSON (bare words are sent as strings)
  pub args: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct PublishArgs {
  /// Topic URI
  pub topic: String,

  /// Positional arguments, each parsed as JSON (bare words are sent as strings)
  pub args: Vec<String>,

  /// Ask the router to acknowledge the publication
  #[clap(long, short, action)]
  pub acknowledge: bool,
}

#[derive(Parser, Debug)]
pub struct SubscribeArgs {
  /// Topic URI
  pub topic: String,

  /// Exit after this many events (runs until Ctrl-C when omitted)
  #[clap(long, short)]
  pub count: Option<usize>,
}

#[derive(clap::Subcommand, Debug)]
pub enum RegistrationsSubcommands {
  /// List registration ids grouped by match policy
  List,
  /// Look up the registration id for a procedure
  Lookup {
    /// Procedure URI
    procedure: String,
  },
  /// Show the details of one registration
  Info {
    /// Registration id
    id: u64,
  },
}
