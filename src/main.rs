use clap::Parser;

use redwire::{Client, Command, ConnectOptions, Reply};

#[derive(Parser)]
#[command(name = "redwire")]
#[command(about = "Send a command to a Redis-compatible server and print the reply")]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = 6379)]
    port: u16,

    /// Logical database index
    #[arg(long, default_value_t = 0)]
    db: u32,

    /// Command and arguments, e.g. `redwire GET name`
    #[arg(required = true, trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let opts = ConnectOptions::new(args.host, args.port).db(args.db);
    let client = Client::connect(opts).await?;

    let mut cmd = Command::new(&args.command[0]);
    for arg in &args.command[1..] {
        cmd = cmd.arg(arg.as_bytes().to_vec());
    }

    let reply = client.send(cmd).await?;
    print_reply(&reply, 0);

    client.quit().await?;
    Ok(())
}

fn print_reply(reply: &Reply, depth: usize) {
    let pad = "  ".repeat(depth);
    match reply {
        Reply::Simple(s) => println!("{pad}{s}"),
        Reply::Error(e) => println!("{pad}(error) {e}"),
        Reply::Integer(n) => println!("{pad}(integer) {n}"),
        Reply::Bulk(None) => println!("{pad}(nil)"),
        Reply::Bulk(Some(b)) => println!("{pad}\"{}\"", String::from_utf8_lossy(b)),
        Reply::Array(None) => println!("{pad}(nil array)"),
        Reply::Array(Some(items)) => {
            for (i, item) in items.iter().enumerate() {
                println!("{pad}{})", i + 1);
                print_reply(item, depth + 1);
            }
        }
    }
}
