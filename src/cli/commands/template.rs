//! `pcbpop template` command - print canonical CSV headers for an input table

use clap::ValueEnum;
use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::normalize::TableKind;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateKind {
    /// Pick-and-place table (`*pos.csv`)
    Placement,
    /// Populated BOM (`*BOM-populated.csv`)
    Bom,
    /// Override table (`*override.csv`)
    Override,
}

impl From<TemplateKind> for TableKind {
    fn from(kind: TemplateKind) -> Self {
        match kind {
            TemplateKind::Placement => TableKind::Placement,
            TemplateKind::Bom => TableKind::Bom,
            TemplateKind::Override => TableKind::Override,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct TemplateArgs {
    /// Table to print headers for
    #[arg(value_enum)]
    pub kind: TemplateKind,
}

pub fn run(args: TemplateArgs, global: &GlobalOpts) -> Result<()> {
    let project = crate::cli::helpers::open_project(global)?;
    let headers = project.config().alias_table().template_headers(args.kind.into());
    println!("{}", headers.join(","));
    Ok(())
}
