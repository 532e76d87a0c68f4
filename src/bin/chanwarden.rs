use chanwarden::app;

fn output_header() -> &'static str {
    "chanwarden\nchanwarden reconciles a Slack workspace's channel list against a CSV ledger of operator intent."
}

fn print_header() {
    println!("{}\n", output_header());
}

fn run() -> Result<(), String> {
    print_header();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let output = app::run_cli(args)?;
    println!("{output}");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
