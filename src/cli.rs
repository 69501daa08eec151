use crate::{add_source_locations, delete_output_files};
use anyhow::Context;
use clap::Parser;
use kconvert_fmt::kconvert_core::{SymbolKind, VariabilityModel};
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Converts the output of KconfigReader into a variability model
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared base path of the `.dimacs` and `.rsf` files
    #[arg(value_hint = clap::ValueHint::FilePath)]
    output_base: PathBuf,
    /// Kconfig source tree to search for symbol declarations
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    source_tree: Option<PathBuf>,
    /// Print the whole model as JSON
    #[arg(long, default_value = "false")]
    json: bool,
    /// Keep a copy of the constraint file at this path
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    dimacs_out: Option<PathBuf>,
    /// Delete the files of the extraction tool afterwards
    #[arg(long, default_value = "false")]
    cleanup: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    model: &'a VariabilityModel,
    dimacs_mapping: BTreeMap<u32, String>,
}

impl Cli {
    pub fn run(&self) -> anyhow::Result<()> {
        let result = self.convert();
        if self.cleanup {
            info!("deleting output files of '{}'", self.output_base.display());
            delete_output_files(&self.output_base);
        }
        let model = result?;

        if let Some(ref dimacs_out) = self.dimacs_out {
            std::fs::copy(model.constraint_file(), dimacs_out).with_context(|| {
                format!("failed to copy constraint file to '{}'", dimacs_out.display())
            })?;
        }

        if self.json {
            let report = Report {
                model: &model,
                dimacs_mapping: model.dimacs_mapping(),
            };
            let stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(stdout, &report).context("failed to serialize model")?;
            println!();
        } else {
            self.summary(&model);
        }
        Ok(())
    }

    fn convert(&self) -> anyhow::Result<VariabilityModel> {
        let mut model = kconvert_fmt::convert(&self.output_base).with_context(|| {
            format!(
                "failed to convert KconfigReader output '{}'",
                self.output_base.display()
            )
        })?;
        if let Some(ref source_tree) = self.source_tree {
            add_source_locations(&mut model, source_tree).with_context(|| {
                format!("failed to scan source tree '{}'", source_tree.display())
            })?;
        }
        Ok(model)
    }

    fn summary(&self, model: &VariabilityModel) {
        let model_name = self
            .output_base
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???");
        let mut bools = 0;
        let mut tristates = 0;
        let mut others = 0;
        for symbol in model.symbols() {
            match symbol.kind() {
                SymbolKind::Bool => bools += 1,
                SymbolKind::Tristate { .. } => tristates += 1,
                SymbolKind::Other(_) => others += 1,
            }
        }
        let roots = model
            .symbols()
            .filter(|symbol| symbol.parent().is_none())
            .count();
        let edges = model
            .symbols()
            .map(|symbol| symbol.used_in_constraints().len())
            .sum::<usize>();
        println!("Model '{model_name}': {} symbols", model.len());
        println!("  {bools} bool, {tristates} tristate, {others} other");
        println!("  {roots} top-level symbols");
        println!("  {edges} constraint references");
        println!("  {} DIMACS variables", model.dimacs_mapping().len());
        println!("Constraint file: {}", model.constraint_file().display());
    }
}
