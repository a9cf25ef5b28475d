extern crate proc_macro;
use heck::AsPascalCase;
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Error, ItemFn, ItemStruct, LitBool, LitStr, Meta, Path, Result, Token, Type,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
    token,
};

struct ApiAttr {
    path: LitStr,
    _comma: token::Comma,
    response_type: Type,
}

impl Parse for ApiAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        Ok(ApiAttr {
            path: input.parse()?,
            _comma: input.parse()?,
            response_type: input.parse()?,
        })
    }
}

/// 为 OneBot 请求参数实现 `Params`，路径即 action 名称。
#[proc_macro_attribute]
pub fn api(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ApiAttr);
    let path = args.path.value();
    let response_type = args.response_type;

    if !path.starts_with('/') || path.len() < 2 {
        return Error::new(
            args.path.span(),
            "Must start with '/' and have an action name (e.g., #[api(\"/send_group_msg\", MyResponse)])",
        )
        .to_compile_error()
        .into();
    }

    let action_str = &path[1..];

    let input = parse_macro_input!(item as ItemStruct);
    let name = &input.ident;

    let expanded = quote! {
        #input

        impl Params for #name {
            type Response = #response_type;

            const ACTION: &'static str = #action_str;
        }
    };

    expanded.into()
}

#[derive(Default)]
struct HandlerArgs {
    command: Option<LitStr>,
    help_msg: Option<LitStr>,
    group_only: bool,
}

impl Parse for HandlerArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut args = HandlerArgs::default();

        if input.is_empty() {
            return Ok(args);
        }

        let pairs = Punctuated::<Meta, Token![,]>::parse_terminated(input)?;
        for meta in pairs {
            let nv = match meta {
                Meta::NameValue(nv) => nv,
                other => {
                    return Err(Error::new_spanned(other, "expected `key = value`"));
                }
            };
            let expr = nv.value;
            if nv.path.is_ident("command") {
                args.command = Some(syn::parse2::<LitStr>(quote!(#expr))?);
            } else if nv.path.is_ident("help_msg") {
                args.help_msg = Some(syn::parse2::<LitStr>(quote!(#expr))?);
            } else if nv.path.is_ident("group_only") {
                let lit: LitBool = syn::parse2(quote!(#expr))?;
                args.group_only = lit.value;
            } else {
                return Err(Error::new_spanned(
                    nv.path,
                    "Unknown attribute key, expected 'command', 'help_msg' or 'group_only'",
                ));
            }
        }

        if args.help_msg.is_some() && args.command.is_none() {
            return Err(Error::new(
                input.span(),
                "'help_msg' only makes sense together with 'command'",
            ));
        }

        Ok(args)
    }
}

/// 把 `async fn xxx(ctx: Context) -> Result<()>` 变成实现 `Handler` 的 `XxxHandler`。
///
/// - `command`：只处理以 `<前缀><command>` 开头的消息
/// - `help_msg`：写入 `BuildHelp::HELP_MSG`
/// - `group_only`：只处理群消息
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);
    let args = parse_macro_input!(attr as HandlerArgs);

    let fn_name = &input_fn.sig.ident;
    let vis = &input_fn.vis;
    let body = &input_fn.block;

    let struct_name = format_ident!(
        "{}Handler",
        AsPascalCase(fn_name.to_string()).to_string(),
        span = fn_name.span()
    );

    let command_filter = match &args.command {
        Some(cmd) => quote! { ctx.is_command(#cmd) },
        None => quote! { true },
    };

    let group_filter = if args.group_only {
        quote! { ctx.get_target().is_group() }
    } else {
        quote! { true }
    };

    let help_impl = args.command.as_ref().map(|_| {
        let help = match &args.help_msg {
            Some(msg) => quote! { #msg },
            None => quote! { "" },
        };
        quote! {
            impl BuildHelp for #struct_name {
                const HELP_MSG: &'static str = #help;
            }
        }
    });

    let expanded = quote! {
        #[derive(Clone, Copy, Default, Debug)]
        #vis struct #struct_name;

        #help_impl

        #[async_trait::async_trait]
        impl<T> Handler<T> for #struct_name
        where
            T: BotClient + BotHandler + std::fmt::Debug + 'static,
        {
            async fn handle(&self, ctx: Context<T>) -> anyhow::Result<()> {
                if !(#group_filter && #command_filter) {
                    return Ok(());
                }
                #[allow(unused_mut)]
                let mut ctx = ctx;
                let result: anyhow::Result<()> = (async move #body).await;
                result
            }
        }
    };

    TokenStream::from(expanded)
}

#[proc_macro]
pub fn register_handlers(input: TokenStream) -> TokenStream {
    let parser = Punctuated::<Path, Token![,]>::parse_terminated;
    let handlers = parse_macro_input!(input with parser);

    let spawns = handlers.iter().map(|handler| {
        quote! {
            {
                let ctx = context.clone();
                let handler_instance = #handler;
                tokio::spawn(async move {
                    if let Err(e) = handler_instance.handle(ctx).await {
                        tracing::error!("Handler [{}] 运行出错: {:?}", stringify!(#handler), e);
                    }
                });
            }
        }
    });

    let expanded = quote! {
        pub fn dispatch_all_handlers<T>(context: Context<T>)
        where
            T: BotClient + BotHandler + std::fmt::Debug + 'static,
        {
            #(#spawns)*
        }
    };

    TokenStream::from(expanded)
}
