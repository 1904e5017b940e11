use syn::{Attribute, Field, Ident, LitStr, Path, Result, Token, Type};

/// Container-level settings from `#[document(...)]` and `#[serde(...)]`.
#[derive(Default)]
pub(crate) struct ContainerAttrs {
    pub(crate) collection: Option<String>,
    pub(crate) krate: Option<Path>,
    pub(crate) rename_all: Option<RenameRule>,
}

impl ContainerAttrs {
    pub(crate) fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut parsed = ContainerAttrs::default();

        for attr in attrs {
            if attr.path().is_ident("document") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("collection") {
                        let name: LitStr = meta.value()?.parse()?;
                        if name.value().trim().is_empty() {
                            return Err(syn::Error::new_spanned(name, "collection name cannot be empty"));
                        }
                        parsed.collection = Some(name.value());
                        Ok(())
                    } else if meta.path.is_ident("crate") {
                        let path: LitStr = meta.value()?.parse()?;
                        parsed.krate = Some(path.parse()?);
                        Ok(())
                    } else {
                        Err(meta.error("unknown document attribute"))
                    }
                })?;
            } else if attr.path().is_ident("serde") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename_all") {
                        if meta.input.peek(Token![=]) {
                            let rule: LitStr = meta.value()?.parse()?;
                            parsed.rename_all = Some(RenameRule::parse(&rule)?);
                        } else {
                            meta.parse_nested_meta(|inner| {
                                let rule: LitStr = inner.value()?.parse()?;
                                if inner.path.is_ident("serialize") {
                                    parsed.rename_all = Some(RenameRule::parse(&rule)?);
                                }
                                Ok(())
                            })?;
                        }
                        Ok(())
                    } else {
                        skip_meta(&meta)
                    }
                })?;
            }
        }

        Ok(parsed)
    }
}

/// Field-level settings from `#[document(...)]` and `#[serde(...)]`.
#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub(crate) id: bool,
    pub(crate) modified_on: bool,
    pub(crate) rename: Option<String>,
    pub(crate) skip: bool,
    pub(crate) flatten: bool,
}

impl FieldAttrs {
    pub(crate) fn parse(field: &Field) -> Result<Self> {
        let mut parsed = FieldAttrs::default();

        for attr in &field.attrs {
            if attr.path().is_ident("document") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("id") {
                        parsed.id = true;
                        Ok(())
                    } else if meta.path.is_ident("modified_on") {
                        parsed.modified_on = true;
                        Ok(())
                    } else {
                        Err(meta.error("unknown document field attribute"))
                    }
                })?;
            } else if attr.path().is_ident("serde") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        if meta.input.peek(Token![=]) {
                            let name: LitStr = meta.value()?.parse()?;
                            parsed.rename = Some(name.value());
                        } else {
                            meta.parse_nested_meta(|inner| {
                                let name: LitStr = inner.value()?.parse()?;
                                if inner.path.is_ident("serialize") {
                                    parsed.rename = Some(name.value());
                                }
                                Ok(())
                            })?;
                        }
                        Ok(())
                    } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                        parsed.skip = true;
                        Ok(())
                    } else if meta.path.is_ident("flatten") {
                        parsed.flatten = true;
                        Ok(())
                    } else {
                        skip_meta(&meta)
                    }
                })?;
            }
        }

        Ok(parsed)
    }
}

/// Consumes a serde option this derive has no use for.
fn skip_meta(meta: &syn::meta::ParseNestedMeta) -> Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let _content;
        syn::parenthesized!(_content in meta.input);
    }
    Ok(())
}

/// The serde `rename_all` conventions, applied to snake_case field names.
#[derive(Clone, Copy)]
pub(crate) enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(rule: &LitStr) -> Result<Self> {
        Ok(match rule.value().as_str() {
            "lowercase" => RenameRule::Lower,
            "UPPERCASE" => RenameRule::Upper,
            "PascalCase" => RenameRule::Pascal,
            "camelCase" => RenameRule::Camel,
            "snake_case" => RenameRule::Snake,
            "SCREAMING_SNAKE_CASE" => RenameRule::ScreamingSnake,
            "kebab-case" => RenameRule::Kebab,
            "SCREAMING-KEBAB-CASE" => RenameRule::ScreamingKebab,
            other => {
                return Err(syn::Error::new_spanned(
                    rule,
                    format!("unsupported rename_all rule {other:?}"),
                ));
            }
        })
    }

    pub(crate) fn apply(self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
            RenameRule::Pascal => field
                .split('_')
                .map(capitalize)
                .collect(),
            RenameRule::Camel => {
                let pascal = RenameRule::Pascal.apply(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// The Rust name of a field, without the raw identifier prefix.
pub(crate) fn unraw(ident: &Ident) -> String {
    let name = ident.to_string();
    name.strip_prefix("r#").map(str::to_string).unwrap_or(name)
}

/// Returns the `T` of an `Option<T>` field type.
pub(crate) fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }

    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }

    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) if args.args.len() == 1 => match args.args.first()? {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
