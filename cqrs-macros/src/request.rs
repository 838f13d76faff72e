use crate::derive_utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Item, LitStr, Result, Token, Type, parse::Parse, parse::ParseStream, parse_macro_input};

#[derive(Clone, Copy)]
pub(crate) enum Kind {
    Command,
    Query,
}

impl Kind {
    fn attr_name(self) -> &'static str {
        match self {
            Kind::Command => "command",
            Kind::Query => "query",
        }
    }
}

/// #[command] / #[query] 宏实现
/// - 支持结构体（具名、tuple、unit）与枚举
/// - 合并/追加派生：Debug, Clone, PartialEq
/// - 实现 `::cqrs_core::Request`（`NAME` 默认为类型名）以及 `Command` 或 `Query`
/// - 参数：`result = Type`（必填），`name = "..."`（可选）
pub(crate) fn expand(kind: Kind, attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as RequestAttrConfig);
    let mut input = parse_macro_input!(item as Item);

    let Some(output) = cfg.result else {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            format!("#[{}] requires `result = Type`", kind.attr_name()),
        )
        .to_compile_error()
        .into();
    };

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
    ];

    let (attrs, ident, generics) = match &mut input {
        Item::Struct(st) => (&mut st.attrs, st.ident.clone(), st.generics.clone()),
        Item::Enum(en) => (&mut en.attrs, en.ident.clone(), en.generics.clone()),
        other => {
            return syn::Error::new(
                other.span(),
                format!("#[{}] only supports struct or enum", kind.attr_name()),
            )
            .to_compile_error()
            .into();
        }
    };

    if let Err(e) = apply_derives(attrs, required) {
        return e.to_compile_error().into();
    }

    let name = cfg
        .name
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let marker = match kind {
        Kind::Command => quote!(::cqrs_core::Command),
        Kind::Query => quote!(::cqrs_core::Query),
    };

    let out = quote! {
        #input

        impl #impl_generics ::cqrs_core::Request for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
            type Output = #output;
        }

        impl #impl_generics #marker for #ident #ty_generics #where_clause {}
    };

    TokenStream::from(out)
}

// -------- parsing --------

struct RequestAttrConfig {
    result: Option<Type>,
    name: Option<LitStr>,
}

impl Parse for RequestAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut result: Option<Type> = None;
        let mut name: Option<LitStr> = None;

        let pairs: Punctuated<RequestAttrElem, Token![,]> = Punctuated::parse_terminated(input)?;

        for elem in pairs {
            match elem {
                RequestAttrElem::Result(key, ty) => {
                    if result.is_some() {
                        return Err(syn::Error::new(
                            key.span(),
                            "duplicate key 'result' in attribute",
                        ));
                    }
                    result = Some(ty);
                }
                RequestAttrElem::Name(key, lit) => {
                    if name.is_some() {
                        return Err(syn::Error::new(
                            key.span(),
                            "duplicate key 'name' in attribute",
                        ));
                    }
                    if lit.value().trim().is_empty() {
                        return Err(syn::Error::new(lit.span(), "'name' must not be empty"));
                    }
                    name = Some(lit);
                }
            }
        }
        Ok(Self { result, name })
    }
}

enum RequestAttrElem {
    Result(syn::Ident, Type),
    Name(syn::Ident, LitStr),
}

impl Parse for RequestAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        if key == "result" {
            Ok(Self::Result(key, input.parse()?))
        } else if key == "name" {
            Ok(Self::Name(key, input.parse()?))
        } else {
            Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'result' | 'name'",
            ))
        }
    }
}
