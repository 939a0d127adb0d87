use anyhow::Result;
use nimbus_core::Config;
use nimbus_ui::{WeatherServices, WeatherViewModel};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "[r] refresh  [u] toggle unit  [q] quit";

enum Event {
    /// A line from stdin, `None` at end of input
    Input(Option<String>),
    Message,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    nimbus_core::init()?;

    let (config, _validation) = Config::load_validated()?;
    tracing::info!("Config directory: {}", config.config_dir.display());

    let services = match WeatherServices::from_config(&config) {
        Ok(services) => services,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    let mut vm = WeatherViewModel::new(
        services,
        config.weather.icon_endpoint.clone(),
        config.weather.temperature_unit,
        tokio::runtime::Handle::current(),
    );

    tracing::info!("Nimbus started");
    vm.refresh();
    redraw(&vm);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let event = tokio::select! {
            line = lines.next_line() => Event::Input(line?),
            _ = vm.next_message() => Event::Message,
        };

        match event {
            Event::Input(None) => break,
            Event::Input(Some(line)) => match line.trim() {
                "r" => vm.refresh(),
                "u" => vm.toggle_unit(),
                "q" => break,
                "" => {}
                other => {
                    println!("Unknown command {:?}. {}", other, HELP);
                    continue;
                }
            },
            Event::Message => {
                vm.poll_channel();
            }
        }
        redraw(&vm);
    }

    tracing::info!("Nimbus stopped");
    Ok(())
}

fn redraw(vm: &WeatherViewModel) {
    println!("\n{}", vm.render());
    println!("{}", HELP);
}
