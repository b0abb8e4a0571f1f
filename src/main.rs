use anyhow::{anyhow, bail, Context, Result};
use rusqlite::Connection;
use std::env;
use tracing_subscriber::EnvFilter;

use hivemind::{setup_database, Config, Entity, Fleet, RecordingModel, SchemaRegistry, TransitionContext, KINDS};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("status");

    // Commands that need no database
    match command {
        "schemas" => return run_schemas(),
        "help" | "--help" | "-h" => {
            print_usage();
            return Ok(());
        }
        _ => {}
    }

    let config = Config::from_env()?;
    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    setup_database(&conn)?;
    let mut fleet = Fleet::open(&conn, &config)?;

    match command {
        "status" => run_status(&fleet),
        "params" => run_params(&fleet, kind_arg(&args)?),
        "transition" => {
            let kind = kind_arg(&args)?;
            let state = args
                .get(3)
                .ok_or_else(|| anyhow!("Usage: hivemind transition <kind> <state> [reason]"))?;
            let mut ctx = TransitionContext::new(config.actor.clone());
            if args.len() > 4 {
                ctx = ctx.with_reason(args[4..].join(" "));
            }
            run_transition(&mut fleet, &conn, kind, state, &ctx)
        }
        "history" => run_history(&fleet, kind_arg(&args)?),
        "lines" => run_lines(&fleet),
        "naval" => run_naval(&fleet),
        "export" => run_export(&fleet, kind_arg(&args)?),
        other => {
            print_usage();
            bail!("Unknown command '{}'", other)
        }
    }
}

fn print_usage() {
    println!("hivemind {}", hivemind::VERSION);
    println!();
    println!("Usage: hivemind <command>");
    println!("  status                              current state of every entity");
    println!("  params <kind>                       parameters of one entity");
    println!("  transition <kind> <state> [reason]  change state and record it");
    println!("  history <kind>                      stored transitions");
    println!("  lines                               mooring line layout");
    println!("  naval                               stability, stiffness, periods");
    println!("  export <kind>                       JSON snapshot");
    println!("  schemas                             parameter schemas");
    println!();
    println!("Kinds: {}", KINDS.join(", "));
}

fn kind_arg(args: &[String]) -> Result<&str> {
    let kind = args
        .get(2)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing entity kind (one of: {})", KINDS.join(", ")))?;

    if !KINDS.contains(&kind) {
        bail!("Unknown entity kind '{}' (one of: {})", kind, KINDS.join(", "));
    }
    Ok(kind)
}

fn entity<'a>(fleet: &'a Fleet, kind: &str) -> Result<&'a dyn Entity> {
    fleet
        .entity(kind)
        .ok_or_else(|| anyhow!("Unknown entity kind '{}'", kind))
}

fn run_status(fleet: &Fleet) -> Result<()> {
    println!("🌊 Hivemind - Fleet Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for entity in fleet.entities() {
        println!(
            "{:<16} {:<24} {:<10} (was {}, {} transitions)",
            entity.kind(),
            entity.name(),
            entity.state_name(),
            entity.previous_state_name().unwrap_or("-"),
            entity.history().len()
        );
        println!("{:<16} states: {}", "", entity.possible_states().join(", "));
    }

    match fleet.site().water_depth() {
        Ok(depth) => println!("\n✓ Water depth at {}: {:.2} m", fleet.site().state_name(), depth),
        Err(e) => println!("\n⚠️  {}", e),
    }

    Ok(())
}

fn run_params(fleet: &Fleet, kind: &str) -> Result<()> {
    let entity = entity(fleet, kind)?;
    let params = entity.parameters();

    println!("📋 {} ({}) - {} parameters", entity.name(), kind, params.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for (name, quantity) in params.iter() {
        println!("{:<32} {}", name, quantity);
    }
    println!("\nFingerprint: {}", params.fingerprint());

    Ok(())
}

fn run_transition(
    fleet: &mut Fleet,
    conn: &Connection,
    kind: &str,
    state: &str,
    ctx: &TransitionContext,
) -> Result<()> {
    let previous = entity(fleet, kind)?.state_name();

    if fleet.transition(conn, kind, state, ctx)? {
        println!("✅ {}: {} → {}", kind, previous, state);
    } else {
        println!("✓ {} already {}", kind, state);
    }

    Ok(())
}

fn run_history(fleet: &Fleet, kind: &str) -> Result<()> {
    let entity = entity(fleet, kind)?;
    let log = entity.history();

    println!("⏰ {} ({}) - {} transitions", entity.name(), kind, log.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}  created in {}", log.started_at().to_rfc3339(), log.initial_state());

    for record in log.records() {
        println!(
            "{}  #{} {} → {} by {}{}",
            record.at.to_rfc3339(),
            record.sequence,
            record.from,
            record.to,
            record.actor,
            record.reason.as_deref().map(|r| format!(" ({})", r)).unwrap_or_default()
        );
    }

    Ok(())
}

fn run_lines(fleet: &Fleet) -> Result<()> {
    let mooring = fleet.mooring();
    let mut model = RecordingModel::new();
    let count = mooring.create_in_ofx(&mut model)?;

    println!("⚓ {} ({}) - {} lines", mooring.name(), mooring.state_name(), count);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for line in model.lines() {
        println!(
            "{:<10} heading {:>7.2}°  L {:>7.1} m  D {:>6.1} mm  Dh {:>6.1} mm  {:>7.1} kg/m  {}",
            line.name,
            line.heading_deg(),
            line.length,
            line.nominal_diameter * 1000.0,
            line.hydrodynamic_diameter * 1000.0,
            line.mass_per_length,
            if line.connected { "connected" } else { "on seabed" }
        );
    }
    println!("\nTotal line mass: {:.1} t", mooring.total_line_mass()? / 1000.0);

    Ok(())
}

fn run_naval(fleet: &Fleet) -> Result<()> {
    let naval = fleet.naval();

    println!("🚢 {} ({}) on {} ({})", naval.name(), naval.state_name(), naval.structure().name(), naval.structure().state_name());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let stability = naval.get_stability()?;
    println!("Draft:   {:>10.3} m", stability.draft);
    println!("KB:      {:>10.3} m", stability.kb);
    println!("KG:      {:>10.3} m", stability.kg);
    println!("GMt:     {:>10.3} m", stability.gm_transverse);
    println!("GMl:     {:>10.3} m", stability.gm_longitudinal);
    println!("{}", if stability.is_stable() { "✓ Stable" } else { "⚠️  Unstable" });

    let stiffness = naval.get_hydrostatic_stiffness()?;
    println!("\nHeave stiffness: {:.4e} N/m", stiffness.heave);
    println!("Roll stiffness:  {:.4e} Nm/rad", stiffness.roll);
    println!("Pitch stiffness: {:.4e} Nm/rad", stiffness.pitch);

    let periods = naval.get_natural_periods()?;
    let show = |p: Option<f64>| p.map(|t| format!("{:.2} s", t)).unwrap_or_else(|| "-".to_string());
    println!("\nHeave period: {:.2} s", periods.heave);
    println!("Roll period:  {}", show(periods.roll));
    println!("Pitch period: {}", show(periods.pitch));

    Ok(())
}

fn run_export(fleet: &Fleet, kind: &str) -> Result<()> {
    let snapshot = entity(fleet, kind)?.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn run_schemas() -> Result<()> {
    let registry = SchemaRegistry::new();

    for kind in registry.kinds() {
        let schema = registry.require(kind)?;
        println!("📐 {}", kind);
        for def in schema.definitions() {
            let default = def.default.map(|q| q.to_string()).unwrap_or_else(|| "-".to_string());
            println!("  {:<32} {:<16} default {:<14} {}", def.name, def.dimension.to_string(), default, def.description);
        }
        println!();
    }

    Ok(())
}
