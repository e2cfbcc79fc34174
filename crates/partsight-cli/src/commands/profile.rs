//! Profile command implementation.

use crate::cli::{ProfileAction, ProfileArgs};
use crate::config::{Config, Profile};
use crate::error::{CliError, Result};
use crate::output::Formatter;

/// Execute the profile command.
pub fn execute_profile(args: ProfileArgs, config: &mut Config, formatter: &Formatter) -> Result<()> {
    let message = match args.action {
        ProfileAction::List => list_profiles(config, formatter),
        ProfileAction::Show => show_active_profile(config, formatter)?,
        ProfileAction::Switch { name } => switch_profile(config, name, formatter)?,
        ProfileAction::Set {
            name,
            endpoint,
            vision_model,
            text_model,
        } => {
            let profile = Profile {
                endpoint,
                vision_model,
                text_model,
            };
            set_profile(config, name, profile, formatter)?
        }
        ProfileAction::Delete { name } => delete_profile(config, name, formatter)?,
    };
    println!("{}", message);
    Ok(())
}

fn describe(profile: &Profile, indent: &str) -> String {
    let mut lines = vec![format!("{}Endpoint: {}", indent, profile.endpoint)];
    lines.push(format!(
        "{}Vision model: {}",
        indent,
        profile.vision_model.as_deref().unwrap_or("auto")
    ));
    lines.push(format!(
        "{}Text model: {}",
        indent,
        profile.text_model.as_deref().unwrap_or("auto")
    ));
    lines.join("\n")
}

fn list_profiles(config: &Config, formatter: &Formatter) -> String {
    if config.profiles.is_empty() {
        return formatter.info("No profiles configured");
    }

    let mut out = vec!["Available profiles:".to_string()];
    for (name, profile) in &config.profiles {
        if name == &config.active_profile {
            out.push(format!("* {}", formatter.success(name)));
        } else {
            out.push(format!("  {}", name));
        }
        out.push(describe(profile, "    "));
    }
    out.join("\n")
}

fn show_active_profile(config: &Config, formatter: &Formatter) -> Result<String> {
    let profile = config.get_active_profile()?;
    Ok(format!(
        "Active profile: {}\n{}",
        formatter.success(&config.active_profile),
        describe(profile, "  ")
    ))
}

fn switch_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<String> {
    config.switch_profile(name.clone())?;
    config.save()?;
    Ok(formatter.success(&format!("Switched to profile '{}'", name)))
}

fn set_profile(config: &mut Config, name: String, profile: Profile, formatter: &Formatter) -> Result<String> {
    let action = if config.profiles.contains_key(&name) {
        "Updated"
    } else {
        "Created"
    };

    config.set_profile(name.clone(), profile);
    config.save()?;
    Ok(formatter.success(&format!("{} profile '{}'", action, name)))
}

fn delete_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<String> {
    if name == config.active_profile {
        return Err(CliError::NotPermitted("Cannot delete the active profile".to_string()));
    }

    if config.profiles.remove(&name).is_some() {
        config.save()?;
        Ok(formatter.success(&format!("Deleted profile '{}'", name)))
    } else {
        Ok(formatter.warning(&format!("Profile '{}' does not exist", name)))
    }
}
