//! Point command handlers.

use std::fmt::Write as _;
use std::time::Duration;

use owo_colors::OwoColorize;
use tabled::Tabled;

use reiri_core::{Controller, ControllerConfig, Point, PointSnapshot, Power};

use crate::cli::{GlobalOpts, OutputFormat, PointsArgs, PointsCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PointRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Temp")]
    temp: String,
    #[tabled(rename = "Setpoint")]
    setpoint: String,
    #[tabled(rename = "Fan")]
    fan: String,
    #[tabled(rename = "Flap")]
    flap: String,
}

impl From<&Point> for PointRow {
    fn from(p: &Point) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name().to_owned(),
            power: text(p.power()),
            mode: text(p.mode()),
            temp: celsius(p.temperature()),
            setpoint: celsius(p.setpoint()),
            fan: text(p.fan_step()),
            flap: text(p.flap()),
        }
    }
}

fn text<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}

fn celsius(value: Option<f64>) -> String {
    value.map_or_else(|| "-".into(), |t| format!("{t:.1} °C"))
}

fn joined<T: ToString>(values: &[T]) -> String {
    if values.is_empty() {
        return "-".into();
    }
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Detail view ─────────────────────────────────────────────────────

fn detail(p: &Point, color: bool) -> String {
    let power = match p.power() {
        Some(Power::On) if color => "on".green().to_string(),
        Some(Power::Off) if color => "off".dimmed().to_string(),
        other => text(other),
    };

    let mut out = String::new();
    let _ = writeln!(out, "ID:          {}", p.id);
    let _ = writeln!(out, "Name:        {}", p.name());
    let _ = writeln!(out, "Power:       {power}");
    let _ = writeln!(out, "Mode:        {}", text(p.mode()));
    let _ = writeln!(out, "Temperature: {}", celsius(p.temperature()));
    if p.outdoor_temperature().is_some() {
        let _ = writeln!(out, "Outdoor:     {}", celsius(p.outdoor_temperature()));
    }
    let _ = writeln!(out, "Setpoint:    {}", celsius(p.setpoint()));
    let _ = writeln!(out, "Fan:         {}", text(p.fan_step()));
    let _ = writeln!(out, "Flap:        {}", text(p.flap()));
    if let Some(alert) = p.filter_alert() {
        let alert = if alert && color {
            "clean filter".yellow().to_string()
        } else if alert {
            "clean filter".into()
        } else {
            "ok".into()
        };
        let _ = writeln!(out, "Filter:      {alert}");
    }
    if let Some(active) = p.thermo_active() {
        let _ = writeln!(out, "Thermo:      {}", if active { "active" } else { "idle" });
    }
    if p.is_climate_unit() {
        let _ = writeln!(out, "Modes:       {}", joined(&p.supported_modes()));
        let _ = writeln!(out, "Fan steps:   {}", joined(&p.fan_steps()));
        let _ = write!(out, "Flap modes:  {}", joined(&p.flap_options()));
    }
    out.trim_end().to_owned()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: ControllerConfig,
    args: PointsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        PointsCommand::List => {
            // setup() has just loaded the table
            let snapshot = Controller::oneshot(config, |c| async move { c.current() }).await?;
            let out = render_snapshot(&snapshot, &global.output)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PointsCommand::Get { id } => {
            let point = Controller::oneshot(config, |c| async move { c.cached_point(&id) }).await?;
            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &point,
                |p| detail(p, color),
                |p| p.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PointsCommand::Watch { interval } => {
            if interval == 0 {
                return Err(CliError::Validation {
                    field: "interval".into(),
                    reason: "must be at least 1 second".into(),
                });
            }
            let controller = Controller::new(ControllerConfig {
                refresh_interval: Duration::from_secs(interval),
                ..config
            });
            controller.setup().await?;
            let result = watch(&controller, global).await;
            controller.shutdown().await;
            result
        }
    }
}

fn render_snapshot(snapshot: &PointSnapshot, format: &OutputFormat) -> Result<String, CliError> {
    output::render_list(
        format,
        &snapshot.points,
        |p| PointRow::from(p),
        |p| p.id.clone(),
    )
}

/// Print every published snapshot until Ctrl-C or the publisher goes away.
async fn watch(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let mut updates = controller.subscribe();
    loop {
        let latest = updates.borrow_and_update().clone();
        if let Some(snapshot) = latest {
            if !global.quiet {
                let at = snapshot.fetched_at.with_timezone(&chrono::Local);
                eprintln!("── {} ──", at.format("%H:%M:%S"));
            }
            let out = render_snapshot(&snapshot, &global.output)?;
            output::print_output(&out, global.quiet);
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}
