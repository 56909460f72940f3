//! `reiri set`: typed changes to one unit, sent as a single operate table.

use reiri_core::{Command, Controller, ControllerConfig, FanStep, Flap, HvacMode, Power};

use crate::cli::{FanArg, GlobalOpts, ModeArg, PowerArg, SetArgs};
use crate::error::CliError;

use super::util;

impl From<PowerArg> for Power {
    fn from(arg: PowerArg) -> Self {
        match arg {
            PowerArg::On => Self::On,
            PowerArg::Off => Self::Off,
        }
    }
}

impl From<ModeArg> for HvacMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Cool => Self::Cool,
            ModeArg::Heat => Self::Heat,
            ModeArg::Fan => Self::Fan,
            ModeArg::Dry => Self::Dry,
            ModeArg::Auto => Self::Auto,
        }
    }
}

impl From<FanArg> for FanStep {
    fn from(arg: FanArg) -> Self {
        match arg {
            FanArg::Auto => Self::Auto,
            FanArg::Low => Self::Low,
            FanArg::MediumLow => Self::MediumLow,
            FanArg::Medium => Self::Medium,
            FanArg::MediumHigh => Self::MediumHigh,
            FanArg::High => Self::High,
        }
    }
}

/// Translate flags into commands. Power goes last so `--power off`
/// wins over the implicit switch-on of `--mode`.
fn commands(args: SetArgs) -> Result<Vec<Command>, CliError> {
    let point = args.id;
    let mut commands = Vec::new();

    if let Some(mode) = args.mode {
        commands.push(Command::SetMode {
            point: point.clone(),
            mode: mode.into(),
        });
    }
    if let Some(celsius) = args.setpoint {
        commands.push(Command::SetSetpoint {
            point: point.clone(),
            celsius,
        });
    }
    if let Some(fan) = args.fan {
        commands.push(Command::SetFanStep {
            point: point.clone(),
            step: fan.into(),
        });
    }
    if let Some(ref flap) = args.flap {
        let flap: Flap = flap.parse()?;
        commands.push(Command::SetFlap {
            point: point.clone(),
            flap,
        });
    }
    if let Some(power) = args.power {
        commands.push(Command::SetPower {
            point,
            power: power.into(),
        });
    }
    Ok(commands)
}

pub async fn handle(
    config: ControllerConfig,
    args: SetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let point = args.id.clone();
    let table = Command::batch(commands(args)?)?;
    tracing::debug!(point = %point, "sending operate table");

    Controller::oneshot(config, |c| async move { c.operate(&table).await }).await?;
    util::status(global.quiet, &format!("✓ Updated {point}"));
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command as CliCommand};

    fn table(argv: &[&str]) -> String {
        let cli = Cli::parse_from(std::iter::once("reiri").chain(argv.iter().copied()));
        let CliCommand::Set(args) = cli.command else {
            panic!("expected set");
        };
        serde_json::to_string(&Command::batch(commands(args).unwrap()).unwrap()).unwrap()
    }

    #[test]
    fn flags_merge_into_one_envelope() {
        assert_eq!(
            table(&["set", "p1", "--mode", "heat", "--setpoint", "22.5", "--fan", "medium-low"]),
            r#"{"p1":{"fanstep":"LM","mode":"H","sp":22.5,"stat":"on"}}"#
        );
    }

    #[test]
    fn explicit_power_off_beats_mode_switch_on() {
        assert_eq!(
            table(&["set", "p1", "--mode", "cool", "--power", "off"]),
            r#"{"p1":{"mode":"C","stat":"off"}}"#
        );
    }

    #[test]
    fn flap_accepts_swing_and_positions() {
        assert_eq!(table(&["set", "p3", "--flap", "swing"]), r#"{"p3":{"flap":"S"}}"#);
        assert_eq!(table(&["set", "p3", "--flap", "2"]), r#"{"p3":{"flap":2}}"#);
    }

    #[test]
    fn bad_flap_is_a_usage_error() {
        let cli = Cli::parse_from(["reiri", "set", "p3", "--flap", "left"]);
        let CliCommand::Set(args) = cli.command else {
            panic!("expected set");
        };
        let err = commands(args).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::exit_code::USAGE);
    }

    #[test]
    fn at_least_one_change_is_required() {
        assert!(Cli::try_parse_from(["reiri", "set", "p1"]).is_err());
    }
}
