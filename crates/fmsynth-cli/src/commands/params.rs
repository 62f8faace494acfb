//! Patch parameter listing command.

use clap::Args;
use fmsynth_core::{Param, ParamValue, Patch};
use fmsynth_synth::algorithm_count;
use serde::Serialize;

#[derive(Args)]
pub struct ParamsArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Only parameters bound to a MIDI CC
    #[arg(long)]
    cc_only: bool,
}

/// One parameter as printed by `params --json`.
#[derive(Debug, Serialize)]
struct ParamRow {
    id: String,
    raw_id: u8,
    label: String,
    kind: String,
    cc: Option<u8>,
    value: serde_json::Value,
}

impl From<&Param> for ParamRow {
    fn from(param: &Param) -> Self {
        let value = match param.value() {
            ParamValue::Byte(v) => serde_json::Value::from(v),
            ParamValue::Bool(v) => serde_json::Value::from(v),
            ParamValue::Uint16(v) => serde_json::Value::from(v),
            ParamValue::Fp32(v) => serde_json::Value::from(v.to_f64()),
        };
        Self {
            id: param.id().to_string(),
            raw_id: param.id().raw(),
            label: param.label().to_string(),
            kind: param.kind().to_string(),
            cc: param.cc(),
            value,
        }
    }
}

pub fn run(args: ParamsArgs) -> anyhow::Result<()> {
    let patch = Patch::initial(algorithm_count())?;
    let rows: Vec<ParamRow> = patch
        .params()
        .filter(|p| !args.cc_only || p.cc().is_some())
        .map(ParamRow::from)
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Patch Parameters");
    println!("================\n");
    println!(
        "  {:20}  {:24}  {:6}  {:>4}  {}",
        "Id", "Label", "Kind", "CC", "Value"
    );
    println!(
        "  {:20}  {:24}  {:6}  {:>4}  {}",
        "--", "-----", "----", "--", "-----"
    );
    for row in &rows {
        let cc = row.cc.map_or_else(|| "-".to_string(), |cc| cc.to_string());
        println!(
            "  {:20}  {:24}  {:6}  {:>4}  {}",
            row.id, row.label, row.kind, cc, row.value
        );
    }
    println!("\nTotal: {} parameter(s)", rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmsynth_core::ParamId;

    #[test]
    fn test_row_from_param() {
        let patch = Patch::initial(algorithm_count()).unwrap();
        let param = patch
            .get(ParamId::ENV_RELEASE | ParamId::GROUP_VCA)
            .unwrap();
        let row = ParamRow::from(param);
        assert_eq!(row.kind, "uint16");
        assert_eq!(row.cc, Some(0x17));
        assert!(row.value.is_u64());
    }

    #[test]
    fn test_rows_serialize() {
        let patch = Patch::initial(algorithm_count()).unwrap();
        let rows: Vec<ParamRow> = patch.params().map(ParamRow::from).collect();
        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json.as_array().unwrap().len(), patch.len());
        assert!(json[0].get("label").is_some());
    }
}
