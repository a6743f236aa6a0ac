mod cli;
mod input;
mod ipc;
mod logging;
mod replay;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
