//! Simularium CLI - Tool for inspecting and converting .simularium files.

use std::env;
use std::path::Path;
use std::process::exit;

use simularium::prelude::*;

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("simularium={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "warn";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "off",
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    match filtered_args[0] {
        // Info command - show container summary
        "info" | "i" => {
            if filtered_args.len() < 2 {
                usage_error("simularium info <file.simularium>");
            }
            cmd_info(filtered_args[1]);
        }

        // Frames command - list the frame table
        "frames" | "f" => {
            if filtered_args.len() < 2 {
                usage_error("simularium frames <file.simularium>");
            }
            cmd_frames(filtered_args[1]);
        }

        // Frame command - dump one frame's agents
        "frame" | "d" => {
            if filtered_args.len() < 3 {
                usage_error("simularium frame <file.simularium> <index> [--json]");
            }
            let json_mode = filtered_args.iter().any(|&s| s == "--json" || s == "-j");
            cmd_frame(filtered_args[1], filtered_args[2], json_mode);
        }

        // Plots command - dump plot data
        "plots" | "p" => {
            if filtered_args.len() < 2 {
                usage_error("simularium plots <file.simularium>");
            }
            cmd_plots(filtered_args[1]);
        }

        // Copy command - round-trip re-export through the converter
        "copy" | "c" => {
            if filtered_args.len() < 3 {
                usage_error("simularium copy <input> <output>");
            }
            cmd_copy(filtered_args[1], filtered_args[2]);
        }

        // Help
        "help" | "h" | "-h" | "--help" => print_help(),

        // Default: if file exists, show info; otherwise error
        _ => {
            if Path::new(filtered_args[0]).exists() {
                cmd_info(filtered_args[0]);
            } else {
                eprintln!("Unknown command: {}", filtered_args[0]);
                eprintln!();
                print_help();
                exit(1);
            }
        }
    }
}

fn usage_error(usage: &str) -> ! {
    eprintln!("Error: missing arguments");
    eprintln!("Usage: {}", usage);
    exit(1)
}

fn print_help() {
    println!("simularium - Simularium trajectory file toolkit");
    println!();
    println!("USAGE:");
    println!("    simularium [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <file>              Show container info and agent types");
    println!("    f, frames <file>              List every frame's time and size");
    println!("    d, frame  <file> <index>      Dump one frame's agents (--json for JSON)");
    println!("    p, plots  <file>              Dump plot data as JSON");
    println!("    c, copy   <in> <out>          Re-export through the converter (round-trip)");
    println!("    h, help                       Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Suppress log output");
    println!();
    println!("EXAMPLES:");
    println!("    simularium info run.simularium        # Quick overview");
    println!("    simularium frame run.simularium 10    # Agents at frame 10");
    println!("    simularium copy in.simularium out     # Test round-trip");
    println!();
    println!("NOTES:");
    println!("    - Passing a .simularium file directly is equivalent to 'info'");
    println!("    - Both binary and legacy JSON containers are supported");
}

fn open_or_exit(path: &str) -> SimulariumData {
    match SimulariumData::open(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to open {}: {}", path, e);
            exit(1);
        }
    }
}

fn cmd_info(path: &str) {
    let data = open_or_exit(path);
    let info = data.trajectory_info();

    let encoding = match &data {
        SimulariumData::Binary(_) => "binary",
        SimulariumData::Json(_) => "JSON",
    };
    println!("Container: {} ({})", path, encoding);
    println!("Info version: {}", info.version);
    if let Some(title) = &info.trajectory_title {
        println!("Title: {}", title);
    }
    println!(
        "Steps: {} x {} {}",
        info.total_steps, info.time_step_size, info.time_units
    );
    println!(
        "Box: {} x {} x {} {}",
        info.size.x, info.size.y, info.size.z, info.spatial_units
    );
    println!();

    println!("Agent types ({}):", info.type_mapping.len());
    for (type_id, entry) in &info.type_mapping {
        match &entry.geometry {
            Some(geometry) => println!("  [{}] {} {}", type_id, entry.name, geometry),
            None => println!("  [{}] {}", type_id, entry.name),
        }
    }
}

fn cmd_frames(path: &str) {
    let data = open_or_exit(path);
    println!("Frames: {}", data.num_frames());
    for index in 0..data.num_frames() {
        match data.frame(index) {
            Ok(frame) => println!(
                "  [{}] t={} agents={}",
                frame.frame_number,
                frame.time,
                frame.agents.len()
            ),
            Err(e) => {
                eprintln!("Failed to read frame {}: {}", index, e);
                exit(1);
            }
        }
    }
}

fn cmd_frame(path: &str, index: &str, json_mode: bool) {
    let Ok(index) = index.parse::<usize>() else {
        eprintln!("Invalid frame index: {}", index);
        exit(1);
    };
    let data = open_or_exit(path);
    let frame = match data.frame(index) {
        Ok(frame) => frame,
        Err(e) => {
            eprintln!("Failed to read frame {}: {}", index, e);
            exit(1);
        }
    };
    let info = data.trajectory_info();

    if json_mode {
        let agents: Vec<serde_json::Value> = frame
            .agents
            .iter()
            .map(|a| {
                serde_json::json!({
                    "uniqueId": a.unique_id,
                    "type": info.type_name(a.type_id).unwrap_or("?"),
                    "vizType": a.viz_type.value(),
                    "position": a.position.to_array(),
                    "rotation": a.rotation.to_array(),
                    "radius": a.radius,
                    "subpoints": &a.subpoints,
                })
            })
            .collect();
        let out = serde_json::json!({
            "frameNumber": frame.frame_number,
            "time": frame.time,
            "agents": agents,
        });
        println!("{}", serde_json::to_string_pretty(&out).unwrap());
        return;
    }

    println!("Frame {} at t={}", frame.frame_number, frame.time);
    for agent in &frame.agents {
        let name = info.type_name(agent.type_id).unwrap_or("?");
        print!(
            "  #{} {} pos=({}, {}, {}) r={}",
            agent.unique_id, name, agent.position.x, agent.position.y, agent.position.z,
            agent.radius
        );
        if !agent.subpoints.is_empty() {
            print!(" subpoints={}", agent.subpoints.len() / 3);
        }
        println!();
    }
}

fn cmd_plots(path: &str) {
    let data = open_or_exit(path);
    match data.plots() {
        Ok(plots) => {
            println!("{}", serde_json::to_string_pretty(&plots).unwrap());
        }
        Err(e) => {
            eprintln!("Failed to read plots: {}", e);
            exit(1);
        }
    }
}

fn cmd_copy(input: &str, output: &str) {
    let data = open_or_exit(input);
    let trajectory = match data.to_trajectory_data() {
        Ok(trajectory) => trajectory,
        Err(e) => {
            eprintln!("Failed to rebuild trajectory from {}: {}", input, e);
            exit(1);
        }
    };
    println!(
        "Read {} frames, {} agent types",
        trajectory.total_steps(),
        data.trajectory_info().type_mapping.len()
    );

    let converter = TrajectoryConverter::new(trajectory).with_progress(Box::new(|done, total| {
        println!("  encoded {}/{} frames", done, total);
    }));
    match converter.write(output) {
        Ok(path) => println!("Wrote {}", path.display()),
        Err(e) => {
            eprintln!("Failed to write {}: {}", output, e);
            exit(1);
        }
    }
}
