use syn::{Attribute, Token};

// 提取非 derive 属性与已有 derive 列表
pub(crate) fn split_derives(attrs: &[Attribute]) -> syn::Result<(Vec<Attribute>, Vec<syn::Path>)> {
    let mut retained = Vec::new();
    let mut existing = Vec::new();
    for attr in attrs.iter() {
        if attr.path().is_ident("derive") {
            let list = attr.parse_args_with(
                syn::punctuated::Punctuated::<syn::Path, Token![,]>::parse_terminated,
            )?;
            existing.extend(list);
        } else {
            retained.push(attr.clone());
        }
    }
    Ok((retained, existing))
}

// 合并必需与已有 derive（按末段去重，必需项在前）
pub(crate) fn merge_derives(existing: Vec<syn::Path>, required: Vec<syn::Path>) -> Attribute {
    let mut seen = std::collections::HashSet::<String>::new();
    let mut final_list: Vec<syn::Path> = Vec::new();
    for p in required.into_iter().chain(existing) {
        if seen.insert(derive_key(&p)) {
            final_list.push(p);
        }
    }
    syn::parse_quote!(#[derive(#(#final_list),*)])
}

// `Debug` 与 `std::fmt::Debug` 视为同一派生
pub(crate) fn derive_key(p: &syn::Path) -> String {
    p.segments
        .last()
        .map(|s| s.ident.to_string())
        .unwrap_or_default()
}

pub(crate) fn apply_derives(
    attrs: &mut Vec<Attribute>,
    required: Vec<syn::Path>,
) -> syn::Result<()> {
    let (retained, existing) = split_derives(attrs)?;
    let merged = merge_derives(existing, required);
    *attrs = std::iter::once(merged).chain(retained).collect();
    Ok(())
}
