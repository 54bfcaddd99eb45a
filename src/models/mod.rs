//! SonarCloud API model types.

mod analysis;
mod history;
mod issue;
mod metric;
mod project;
mod repo;

pub use analysis::*;
pub use history::*;
pub use issue::*;
pub use metric::*;
pub use project::*;
pub use repo::*;
