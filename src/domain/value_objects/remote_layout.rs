//! Remote filesystem layout and the commands run against it
//!
//! Every path interpolated into a command is quoted with `shell-words`, so a
//! layout with unusual directory names still produces a single safe command.

use shell_words::quote;

use crate::domain::entities::MANIFEST_FILE_NAME;

/// Marker file that tells the controller's launcher to run in debug mode.
pub const DEBUG_MARKER: &str = "/tmp/frcdebug";

/// Prints `{name: [Requires-Dist, ...]}` for every installed distribution.
const REQUIRES_SCRIPT: &str = "import json, importlib.metadata as m; \
print(json.dumps({d.metadata['Name']: d.requires or [] \
for d in m.distributions() if d.metadata['Name']}))";

/// Paths and tools on the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    pub deploy_dir: String,
    pub code_subdir: String,
    pub staging_subdir: String,
    pub python: String,
    pub kill_script: String,
    pub owner: String,
    pub profile_scripts: Vec<String>,
    pub library_path: String,
}

impl Default for RemoteLayout {
    fn default() -> Self {
        Self {
            deploy_dir: "/home/lvuser".to_string(),
            code_subdir: "py".to_string(),
            staging_subdir: "py_new".to_string(),
            python: "/usr/local/bin/python3".to_string(),
            kill_script: "/usr/local/frc/bin/frcKillRobot.sh".to_string(),
            owner: "lvuser:ni".to_string(),
            profile_scripts: vec![
                "/etc/profile.d/frc-path.sh".to_string(),
                "/etc/profile.d/natinst-path.sh".to_string(),
            ],
            library_path: "/usr/local/frc/lib/".to_string(),
        }
    }
}

fn join(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

impl RemoteLayout {
    /// Directory the running program is loaded from.
    pub fn code_dir(&self) -> String {
        join(&self.deploy_dir, &self.code_subdir)
    }

    /// Directory uploads land in before the swap.
    pub fn staging_dir(&self) -> String {
        join(&self.deploy_dir, &self.staging_subdir)
    }

    /// Where the last deployed build manifest lives.
    pub fn manifest_path(&self) -> String {
        join(&self.code_dir(), MANIFEST_FILE_NAME)
    }

    /// File the launcher reads its start command from.
    pub fn command_file(&self, debug: bool) -> String {
        let name = if debug {
            "robotDebugCommand"
        } else {
            "robotCommand"
        };
        join(&self.deploy_dir, name)
    }

    /// Empty the staging directory, leaving the live code alone.
    pub fn prepare_staging_command(&self) -> String {
        let staging = quote(&self.staging_dir()).into_owned();
        format!("rm -rf {staging} && mkdir -p {staging}")
    }

    /// Create remote directories ahead of an upload.
    pub fn mkdir_command<'a>(dirs: impl IntoIterator<Item = &'a str>) -> String {
        let quoted: Vec<String> = dirs.into_iter().map(|d| quote(d).into_owned()).collect();
        format!("mkdir -p {}", quoted.join(" "))
    }

    /// Replace the live code with the fully uploaded staging directory.
    pub fn swap_command(&self) -> String {
        format!(
            "rm -rf {code} && mv {staging} {code}",
            code = quote(&self.code_dir()),
            staging = quote(&self.staging_dir()),
        )
    }

    pub fn interpreter_check_command(&self) -> String {
        format!("test -x {}", quote(&self.python))
    }

    fn pip(&self) -> String {
        format!(
            "{} -m pip --no-cache-dir --disable-pip-version-check",
            quote(&self.python)
        )
    }

    pub fn pip_list_command(&self) -> String {
        format!("{} list --format=json", self.pip())
    }

    /// Lists what every installed distribution requires, as JSON.
    pub fn pip_requires_command(&self) -> String {
        format!("{} -c {}", quote(&self.python), quote(REQUIRES_SCRIPT))
    }

    pub fn pip_install_command(&self, spec: &str, force: bool, extra_args: &[String]) -> String {
        let mut cmd = format!("{} install --root-user-action=ignore", self.pip());
        if force {
            cmd.push_str(" --force-reinstall");
        }
        for arg in extra_args {
            cmd.push(' ');
            cmd.push_str(&quote(arg));
        }
        cmd.push(' ');
        cmd.push_str(&quote(spec));
        cmd
    }

    pub fn pip_uninstall_command(&self, package: &str) -> String {
        format!(
            "{} uninstall --root-user-action=ignore --yes {}",
            self.pip(),
            quote(package)
        )
    }

    /// The single-line start command the launcher executes.
    pub fn robot_command(&self, main_file: &str, debug: bool) -> String {
        let main = join(&self.code_dir(), main_file);
        let mut cmd = format!("env LD_LIBRARY_PATH={}", quote(&self.library_path));
        if debug {
            cmd.push_str(" ROBOTPY_DEBUG=1");
        }
        cmd.push_str(&format!(" {} -u", quote(&self.python)));
        if !debug {
            cmd.push_str(" -O");
        }
        cmd.push_str(&format!(" -m robotpy --main {}", quote(&main)));
        if debug {
            cmd.push_str(" -v");
        }
        cmd.push_str(" run");
        cmd
    }

    pub fn write_robot_command(&self, main_file: &str, debug: bool) -> String {
        format!(
            "echo {} > {}",
            quote(&self.robot_command(main_file, debug)),
            quote(&self.command_file(debug))
        )
    }

    pub fn debug_marker_command(&self) -> String {
        format!("touch {}", DEBUG_MARKER)
    }

    pub fn compile_command(&self, debug: bool) -> String {
        let optimize = if debug { "" } else { " -O" };
        format!(
            "{}{} -m compileall -q -r 5 {}",
            quote(&self.python),
            optimize,
            quote(&self.code_dir())
        )
    }

    /// `cmd` prefixed by sourcing the controller's profile scripts.
    pub fn with_profile(&self, cmd: &str) -> String {
        let mut out = String::new();
        for script in &self.profile_scripts {
            out.push_str(&format!(". {}; ", quote(script)));
        }
        out.push_str(cmd);
        out
    }

    pub fn chown_command(&self) -> String {
        self.with_profile(&format!(
            "chown -R {} {}",
            quote(&self.owner),
            quote(&self.code_dir())
        ))
    }

    pub fn stop_command(&self) -> String {
        self.with_profile(&format!("{} -t", quote(&self.kill_script)))
    }

    /// Stops and deletes C++/Java user programs left by another toolchain,
    /// so the launcher cannot pick them up again.
    pub fn remove_foreign_programs_command(&self) -> String {
        let dir = quote(self.deploy_dir.trim_end_matches('/')).into_owned();
        let programs = format!("{dir}/*.jar {dir}/frcUserProgram");
        let kill = quote(&self.kill_script);
        self.with_profile(&format!(
            "for f in {programs}; do if [ -e \"$f\" ]; then \
             {kill} -t; rm -rf {programs}; break; fi; done"
        ))
    }

    pub fn start_command(&self) -> String {
        self.with_profile(&format!("{} -t -r", quote(&self.kill_script)))
    }

    /// Prints the deployed manifest, or `{}` when none exists.
    pub fn read_manifest_command(&self) -> String {
        let path = quote(&self.manifest_path()).into_owned();
        format!("if [ -f {path} ]; then cat {path}; else echo '{{}}'; fi")
    }
}
