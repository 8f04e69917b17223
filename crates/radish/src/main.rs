mod args;
mod client;
mod config;
mod format;

use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;
use tokio::io::BufReader;

use crate::client::Client;
use crate::config::Cli;
use crate::config::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	let args = Cli::parse();
	let config = config::setup(&args)?;
	let mut client = Client::connect(&config).await?;

	if args.command.is_empty() {
		repl(&mut client).await?;
	} else {
		let reply = client.execute(&args.command).await?;
		println!("{}", format::format_reply(&reply));
	}
	Ok(())
}

/// Run one command per stdin line until EOF or `quit`.
async fn repl<S>(client: &mut Client<S>) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	while let Some(line) = lines.next_line().await? {
		let words = match args::split_line(&line) {
			Ok(words) => words,
			Err(e) => {
				println!("(error) Invalid argument(s): {}", e);
				continue;
			}
		};
		let Some(name) = words.first() else {
			continue;
		};
		if name.eq_ignore_ascii_case("quit") || name.eq_ignore_ascii_case("exit") {
			break;
		}

		let reply = client.execute(&words).await?;
		println!("{}", format::format_reply(&reply));
	}
	Ok(())
}
