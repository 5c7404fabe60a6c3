use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "evrolev-server")]
#[command(about = "EvroLev backend: change calculator, contact relay, license activation")]
#[command(version)]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://evrolev.db")]
    pub database_url: String,

    /// Shared secret for signing activation tokens
    #[arg(
        long,
        env = "ACTIVATION_JWT_SECRET",
        default_value = "change-me-in-production"
    )]
    pub activation_jwt_secret: String,

    /// Activation token validity in days
    #[arg(long, env = "ACTIVATION_TOKEN_DAYS", default_value = "30")]
    pub activation_token_days: i64,

    /// Payment provider webhook signing secret; webhook deliveries are
    /// rejected with a configuration error while unset
    #[arg(long, env = "STRIPE_WEBHOOK_SECRET")]
    pub stripe_webhook_secret: Option<String>,

    /// Resend API key; contact submissions fail with a configuration
    /// error while unset
    #[arg(long, env = "RESEND_API_KEY")]
    pub resend_api_key: Option<String>,

    /// Sender address for contact inquiries
    #[arg(long, env = "RESEND_FROM", default_value = "onboarding@resend.dev")]
    pub resend_from: String,

    /// Inbox that receives contact inquiries
    #[arg(long, env = "CONTACT_TO", default_value = "bgwebstudio28@gmail.com")]
    pub contact_to: String,

    /// Max activation attempts per window per ip:device key
    #[arg(long, env = "ACTIVATION_RATE_LIMIT", default_value = "5")]
    pub activation_rate_limit: u32,

    /// Activation rate-limit window in seconds
    #[arg(long, env = "ACTIVATION_RATE_WINDOW_SECS", default_value = "60")]
    pub activation_rate_window_secs: u64,
}

impl Config {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
