//! API-key store handlers.

use secrecy::SecretString;
use tabled::Tabled;

use nilo_core::{ApiKeyCredential, NewCredential, import_credential};

use crate::cli::{GlobalOpts, KeyFields, KeysArgs, KeysCommand};
use crate::error::CliError;
use crate::output;

use super::Context;
use super::util::{self, dash};

#[derive(Tabled)]
struct KeyRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Tenant")]
    tenant: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Valid Before")]
    valid_before: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&ApiKeyCredential> for KeyRow {
    fn from(c: &ApiKeyCredential) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            service: c.service.clone(),
            tenant: dash(c.tenant_id.as_deref()),
            key: c.masked_key(),
            valid_before: dash(c.valid_before.as_deref()),
            updated: dash(c.updated_at.as_deref().or(c.created_at.as_deref())),
        }
    }
}

fn key_value(from_stdin: bool, label: &str) -> Result<SecretString, CliError> {
    if from_stdin {
        util::read_secret_stdin("key")
    } else {
        util::prompt_secret(label, "key")
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, CliError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CliError::Validation {
            field: field.into(),
            reason: format!("--{field} is required"),
        })
}

/// Copy the flags that were given onto a stored credential.
fn apply_fields(credential: &mut ApiKeyCredential, fields: KeyFields) {
    if let Some(name) = fields.name {
        credential.name = name;
    }
    if let Some(service) = fields.service {
        credential.service = service;
    }
    if let Some(url) = fields.url {
        credential.url = Some(url);
    }
    if let Some(tenant) = fields.tenant_id {
        credential.tenant_id = Some(tenant);
    }
    if let Some(valid_before) = fields.valid_before {
        credential.valid_before = Some(valid_before);
    }
}

fn print_key(credential: &ApiKeyCredential, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(
        global.output,
        credential,
        |c| {
            let rows = [KeyRow::from(c)];
            output::render_table(&rows)
        },
        |c| c.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(ctx: &Context, args: KeysArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let keys = ctx.dashboard.keys()?;
    let config = ctx.dashboard.config();

    match args.command {
        KeysCommand::List => {
            let listed = util::with_spinner(global, "Loading keys", keys.list(&ctx.cancel)).await?;
            let out = output::render_list(
                global.output,
                listed.as_slice(),
                |c| KeyRow::from(c),
                |c| c.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        KeysCommand::Create(fields) => {
            let name = required(fields.name, "name")?;
            let service = fields
                .service
                .unwrap_or_else(|| config.credential_target.clone());
            let key = key_value(fields.key_stdin, "API key: ")?;
            let credential = NewCredential {
                name,
                key,
                service,
                url: fields.url,
                valid_before: fields.valid_before,
                tenant_id: fields.tenant_id.or_else(|| config.tenant_id.clone()),
            };
            let created = keys.create(credential, &ctx.cancel).await?;
            print_key(&created, global)
        }

        KeysCommand::Update { id, fields, rotate } => {
            let stored = keys.ensure_loaded(&ctx.cancel).await?;
            let mut credential = stored
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or_else(|| CliError::KeyStore {
                    status: 404,
                    message: format!("no stored key with id {id}"),
                })?;
            let stdin = fields.key_stdin;
            apply_fields(&mut credential, fields);
            if rotate || stdin {
                credential.key = key_value(stdin, "New API key: ")?;
            }
            let updated = keys.update(&credential, &ctx.cancel).await?;
            print_key(&updated, global)
        }

        KeysCommand::Delete { id } => {
            if !util::confirm(&format!("Delete API key {id}?"), global.yes)? {
                return Ok(());
            }
            keys.delete(&id, &ctx.cancel).await?;
            if !global.quiet {
                eprintln!("✓ deleted {id}");
            }
            Ok(())
        }

        KeysCommand::Import { file, service } => {
            let doc = util::read_json_file(&file)?;
            let mut credential = import_credential(&doc)?;
            if credential.service.trim().is_empty() {
                credential.service = service.unwrap_or_else(|| config.credential_target.clone());
            }
            if credential.tenant_id.is_none() {
                credential.tenant_id.clone_from(&config.tenant_id);
            }
            if credential.name.trim().is_empty() {
                credential.name = file
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
            }
            let created = keys.create(credential, &ctx.cancel).await?;
            print_key(&created, global)
        }
    }
}
