use hostpack_core::{is_framework_compatible, Package};

use crate::{Intent, OperationPlan};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preview {
    pub intent: String,
    pub added: Vec<Package>,
    pub removed: Vec<Package>,
    pub changed: Vec<(Package, Package)>,
    pub native: Vec<Package>,
    pub incompatible: Vec<Package>,
    pub skipped: Vec<Package>,
}

impl Preview {
    pub fn build(
        intent: &Intent,
        plan: &OperationPlan,
        native: &[Package],
        host_frameworks: &[String],
    ) -> Self {
        Self {
            intent: intent.to_string(),
            added: plan.fresh_installs().into_iter().cloned().collect(),
            removed: plan.uninstall_only().into_iter().cloned().collect(),
            changed: plan
                .changes()
                .into_iter()
                .map(|(old, new)| (old.clone(), new.clone()))
                .collect(),
            native: native.to_vec(),
            incompatible: plan
                .install
                .iter()
                // an empty list means the host did not report its frameworks
                .filter(|package| {
                    !host_frameworks.is_empty()
                        && !is_framework_compatible(host_frameworks, &package.target_framework)
                })
                .cloned()
                .collect(),
            skipped: plan.skipped.clone(),
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.native.is_empty() || !self.incompatible.is_empty()
    }
}

pub fn render_preview_lines(preview: &Preview) -> Vec<String> {
    let mut lines = vec![format!("{}:", preview.intent)];
    for package in &preview.added {
        lines.push(format!("  + {package}"));
    }
    for (old, new) in &preview.changed {
        if old.version == new.version {
            lines.push(format!("  ~ {new} (reinstall)"));
        } else {
            lines.push(format!("  ~ {} {} -> {}", new.id, old.version, new.version));
        }
    }
    for package in &preview.removed {
        lines.push(format!("  - {package}"));
    }
    for package in &preview.skipped {
        lines.push(format!("  = {package} is provided by the host; skipped"));
    }
    for package in &preview.native {
        lines.push(format!(
            "  ! {package} contains native plugins; the host must restart to finish"
        ));
    }
    for package in &preview.incompatible {
        lines.push(format!(
            "  ! {package} targets '{}', which this host does not list",
            package.target_framework
        ));
    }
    lines
}
