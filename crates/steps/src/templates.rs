use crate::error::StepError;
use minijinja::{context, Environment};

const LAUNCHER: &str = r#"#!/usr/bin/env bash
set -euo pipefail
SCRIPT_DIR="${INPUT{{ input_index }}_STAGING_DIR}"
chmod -R +x "$SCRIPT_DIR"
exec "$SCRIPT_DIR/{{ script_name }}" "$@"
"#;

/// Wrapper that makes a staged script directory executable and runs one
/// script from it with the activity's arguments.
pub fn render_launcher(input_index: usize, script_name: &str) -> Result<String, StepError> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.add_template("launcher.sh", LAUNCHER)?;
    let template = env.get_template("launcher.sh")?;
    Ok(template.render(context! { input_index, script_name })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launcher_points_at_the_staged_directory() {
        let launcher = render_launcher(2, "run.py").unwrap();
        assert!(launcher.starts_with("#!/usr/bin/env bash\n"));
        assert!(launcher.contains("SCRIPT_DIR=\"${INPUT2_STAGING_DIR}\""));
        assert!(launcher.contains("chmod -R +x \"$SCRIPT_DIR\""));
        assert!(launcher.ends_with("exec \"$SCRIPT_DIR/run.py\" \"$@\"\n"));
    }
}
