//! Outputs for people and other tools: CSV tables and templated source code.

pub mod codegen;
pub mod csv;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Core(#[from] netgroup_core::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("one-to-many maps have no CSV form; build a many-to-many map instead")]
    OneToManyCsv,

    #[error(
        "template {} is not inside the template directory {}",
        template.display(),
        dir.display()
    )]
    TemplateOutsideDir { template: PathBuf, dir: PathBuf },

    #[error("Failed to render template: {0}")]
    Template(#[from] minijinja::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
