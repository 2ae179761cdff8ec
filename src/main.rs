use json_drift::cli;

fn main() {
    let command_line_interface = cli::CommandLineInterface::load();
    let code = match command_line_interface.run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            cli::EXIT_FAILURE
        }
    };
    std::process::exit(code);
}
