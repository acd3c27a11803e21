//! cairn command-line entry point.

use cairn::cli::{self, EXIT_OK, exit_code_for, render_error};

#[tokio::main]
async fn main() {
    let cli = cli::parse();
    let json = cli.json;

    let code = match cairn::run(cli).await {
        Ok(()) => EXIT_OK,
        Err(error) => {
            let code = exit_code_for(&error);
            render_error(error, json);
            code
        }
    };
    std::process::exit(code);
}
