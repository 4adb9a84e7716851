use std::env;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use inquire::{Select, Text};
use serialport::SerialPort;
use tetech_tc4820::controller::Tc4820;
use tetech_tc4820::cycle::{self, CycleConfig, CyclePoint};
use tetech_tc4820::parameter::OutputState;

// Configuration constants - adjust these for your setup
const BAUD_RATE: u32 = 115200;
// Replies are 8 bytes at 115200 baud; 100 ms is plenty.
const SERIAL_TIMEOUT_MS: u64 = 100;

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

/// Parse durations like `90`, `600s`, `25m` or `1.5h` into seconds.
fn parse_duration(arg: &str) -> Result<Duration, String> {
    let (number, unit) = match arg.as_bytes().last() {
        Some(b's') => (&arg[..arg.len() - 1], 1.0),
        Some(b'm') => (&arg[..arg.len() - 1], 60.0),
        Some(b'h') => (&arg[..arg.len() - 1], 3600.0),
        _ => (arg, 1.0),
    };
    let seconds: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{arg}'"))?;
    if seconds < 0.0 {
        return Err(format!("invalid duration '{arg}'"));
    }
    Ok(Duration::from_secs_f64(seconds * unit))
}

/// Parse a cycle point formatted as `[duration]@[temperature]`,
/// e.g. `25m@-20` or `1.5h@30`.
fn parse_cycle_point(arg: &str) -> Result<CyclePoint, String> {
    let (duration, temperature) = arg
        .split_once('@')
        .ok_or_else(|| format!("invalid cycle point '{arg}', expected duration@temperature"))?;
    let dwell = parse_duration(duration)?;
    let temperature_c: f32 = temperature
        .parse()
        .map_err(|_| format!("invalid temperature '{temperature}'"))?;
    Ok(CyclePoint::new(temperature_c, dwell))
}

fn print_status(tc: &mut Tc4820<PortWrapper>) {
    match tc.read_status() {
        Ok(status) => {
            let flags: Vec<&str> = status.active_labels().collect();
            println!("status flags: {}", flags.join(", "));

            match tc.get_setpoint_c() {
                Ok(setpoint) => println!("temperature set point: {setpoint:.1} °C"),
                Err(e) => println!("failed to read set point: {e}"),
            }
            match tc.read_control_temperature_c() {
                Ok(temp) => println!("current temperature: {temp:.1} °C"),
                Err(e) => println!("failed to read temperature: {e}"),
            }
            if status.aux_sensor_present() {
                match tc.read_aux_temperature_c() {
                    Ok(aux) => println!("current secondary temperature: {aux:.1} °C"),
                    Err(e) => println!("failed to read secondary temperature: {e}"),
                }
            }
        }
        Err(e) => println!("failed to read status: {e}"),
    }

    match tc.get_output_state() {
        Ok(OutputState::On) => match tc.read_output_power() {
            Ok(power) => println!("output power fraction: {:2.1} %", 100.0 * power),
            Err(e) => println!("failed to read output power: {e}"),
        },
        Ok(OutputState::Off) => println!("output disabled"),
        Err(e) => println!("failed to read output state: {e}"),
    }
}

fn set_setpoint(tc: &mut Tc4820<PortWrapper>) {
    let input = Text::new("Set point in °C:").prompt().expect("prompt failed");
    let temperature_c: f32 = input.trim().parse().expect("not a number");
    match tc.set_setpoint_c(temperature_c) {
        Ok(echoed) => println!("temperature setpoint set to {echoed} °C"),
        Err(e) => println!("failed to set temperature setpoint: {e}"),
    }
}

fn tune_parameter(
    tc: &mut Tc4820<PortWrapper>,
    label: &str,
    get: fn(&mut Tc4820<PortWrapper>) -> tetech_tc4820::error::Result<f32, IoError>,
    set: fn(&mut Tc4820<PortWrapper>, f32) -> tetech_tc4820::error::Result<f32, IoError>,
) {
    let current = match get(tc) {
        Ok(value) => value,
        Err(e) => {
            println!("failed to read {label}: {e}");
            return;
        }
    };
    let input = Text::new(&format!("{label} (empty to keep {current}):"))
        .prompt()
        .expect("prompt failed");
    let input = input.trim();
    if input.is_empty() {
        return;
    }
    let value: f32 = input.parse().expect("not a number");
    match set(tc, value) {
        Ok(echoed) => println!("{label} set to {echoed}"),
        Err(e) => println!("failed to set {label}: {e}"),
    }
}

fn tune_control_loop(tc: &mut Tc4820<PortWrapper>) {
    tune_parameter(
        tc,
        "proportional bandwidth in °C",
        Tc4820::get_proportional_bandwidth_c,
        Tc4820::set_proportional_bandwidth_c,
    );
    tune_parameter(
        tc,
        "integral gain in repeats/min",
        Tc4820::get_integral_gain,
        Tc4820::set_integral_gain,
    );
    tune_parameter(
        tc,
        "differential gain in min",
        Tc4820::get_differential_gain,
        Tc4820::set_differential_gain,
    );
}

fn toggle_output(tc: &mut Tc4820<PortWrapper>) {
    match tc.get_output_state() {
        Ok(state) => {
            let next = match state {
                OutputState::On => OutputState::Off,
                OutputState::Off => OutputState::On,
            };
            match tc.set_output_state(next) {
                Ok(()) => println!("output now {next:?}"),
                Err(e) => println!("failed to switch output: {e}"),
            }
        }
        Err(e) => println!("failed to read output state: {e}"),
    }
}

fn run_cycles(tc: &mut Tc4820<PortWrapper>) {
    let point_a = Text::new("Cycle point A (duration@temperature):")
        .with_help_message("e.g. 25m@30 or 600s@-5")
        .prompt()
        .expect("prompt failed");
    let point_a = parse_cycle_point(point_a.trim()).expect("bad cycle point");

    let point_b = Text::new("Cycle point B (duration@temperature):")
        .prompt()
        .expect("prompt failed");
    let point_b = parse_cycle_point(point_b.trim()).expect("bad cycle point");

    let cycles = Text::new("Number of cycles (empty for unbounded):")
        .prompt()
        .expect("prompt failed");
    let cycles = match cycles.trim() {
        "" => None,
        n => Some(n.parse().expect("not a number")),
    };

    println!(
        "Cycling {:?} times: {} s @ {} °C, {} s @ {} °C",
        cycles,
        point_a.dwell.as_secs(),
        point_a.temperature_c,
        point_b.dwell.as_secs(),
        point_b.temperature_c,
    );

    // Unbounded runs have no cancel path wired up here; Ctrl-C aborts the
    // whole process instead.
    let cancel = AtomicBool::new(false);
    let config = CycleConfig::new(point_a, point_b, cycles);
    let summary = cycle::run(tc, &config, &cancel, |progress| {
        let power = progress
            .output_power
            .map(|p| format!("{:2.1} %", 100.0 * p))
            .unwrap_or_else(|| "--".to_string());
        println!(
            "[{:>8}] {:?}: {:.1} °C, output power: {}, cycles done: {}",
            progress.elapsed.as_secs(),
            progress.phase,
            progress.measured_c,
            power,
            progress.completed_cycles,
        );
    })
    .expect("cycling run failed");

    println!(
        "{:?} after {} cycles in {} s",
        summary.outcome,
        summary.completed_cycles,
        summary.elapsed.as_secs()
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    let port = serialport::new(&port_name, BAUD_RATE)
        .timeout(Duration::from_millis(SERIAL_TIMEOUT_MS))
        .open()
        .expect("Failed to open serial port");

    // The model handshake runs before anything else; a non-TC-48-20 on the
    // other end aborts here.
    let mut tc = match Tc4820::connect(PortWrapper(port)) {
        Ok(tc) => tc,
        Err(e) => {
            eprintln!("execution failed: {e}");
            std::process::exit(1);
        }
    };

    let action = Select::new(
        "Action:",
        vec!["status", "set setpoint", "tune", "toggle output", "cycle"],
    )
    .prompt()
    .expect("Failed to select action");

    match action {
        "status" => print_status(&mut tc),
        "set setpoint" => set_setpoint(&mut tc),
        "tune" => tune_control_loop(&mut tc),
        "toggle output" => toggle_output(&mut tc),
        "cycle" => run_cycles(&mut tc),
        _ => unreachable!(),
    }
}
