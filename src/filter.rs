use crate::schema::{get_spec, table_names, DependencyResolver, LoadSpec};
use crate::ui::Reporter;
use anyhow::{anyhow, bail, Result};

/// Resolves which load steps to run based on include/exclude filters
pub fn resolve_specs(
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    reporter: &mut impl Reporter,
) -> Result<Vec<&'static LoadSpec>> {
    let resolver = DependencyResolver::new();
    resolver.validate_order().map_err(|e| anyhow!(e))?;

    let named = include.iter().chain(exclude.iter()).flatten();
    for name in named {
        if get_spec(name).is_none() {
            bail!(
                "Unknown table: {} (known tables: {})",
                name,
                table_names().join(", ")
            );
        }
    }

    match (include, exclude) {
        (Some(_), Some(_)) => {
            bail!("Cannot use both --include and --exclude at the same time");
        }
        (Some(include_list), None) => {
            let refs: Vec<&str> = include_list.iter().map(|s| s.as_str()).collect();
            let specs = resolver.resolve_includes(&refs).map_err(|e| anyhow!(e))?;

            reporter.log(format!("Loading {} tables (with FK parents):", specs.len()));
            for spec in &specs {
                reporter.log(format!("  - {}", spec.table));
            }

            Ok(specs)
        }
        (None, Some(exclude_list)) => {
            let refs: Vec<&str> = exclude_list.iter().map(|s| s.as_str()).collect();
            let specs = resolver.resolve_excludes(&refs).map_err(|e| anyhow!(e))?;

            reporter.log(format!(
                "Loading {} tables (after excluding {:?} and dependents)",
                specs.len(),
                refs
            ));

            Ok(specs)
        }
        (None, None) => Ok(resolver.all_in_order()),
    }
}
