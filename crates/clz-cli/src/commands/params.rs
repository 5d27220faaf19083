use std::error::Error;

use clap::Args;
use clz_stage::{check_param_table, ParamDefault, StageKind};

#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// Only list this stage (cache_create, cache_drop, auto_correlate, cross_correlate, summarize).
    #[arg(long, value_parser = parse_kind)]
    pub stage: Option<StageKind>,
}

fn parse_kind(name: &str) -> Result<StageKind, String> {
    StageKind::ALL
        .into_iter()
        .find(|kind| kind.name() == name)
        .ok_or_else(|| format!("unknown stage '{name}'"))
}

fn render_default(default: Option<ParamDefault>, required: bool) -> String {
    match default {
        _ if required => "required".to_string(),
        None => "-".to_string(),
        Some(ParamDefault::Str(text)) => text.to_string(),
        Some(ParamDefault::Int(value)) => value.to_string(),
        Some(ParamDefault::Float(value)) => value.to_string(),
        Some(ParamDefault::Bool(value)) => value.to_string(),
    }
}

pub fn run(args: &ParamsArgs) -> Result<(), Box<dyn Error>> {
    check_param_table()?;
    let kinds: Vec<StageKind> = match args.stage {
        Some(kind) => vec![kind],
        None => StageKind::ALL.to_vec(),
    };
    for kind in kinds {
        println!("{}", kind.name());
        for spec in kind.params() {
            println!(
                "  {:<14} {:<15} {:<14} {}",
                spec.name,
                spec.kind.to_string(),
                render_default(spec.default, spec.required),
                spec.help
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_parse() {
        assert_eq!(parse_kind("cross_correlate"), Ok(StageKind::CrossCorrelate));
        assert!(parse_kind("cross").is_err());
    }
}
