use proc_macro::TokenStream;
use syn::{ItemFn, parse_macro_input};

/// Mark a function as part of the boot path. Functions with this attribute
/// are placed in the `.text.init` section, which the linker script keeps
/// right after the boot stub so that everything executed only once during
/// boot is grouped together at the start of the image.
///
/// # Panics
/// This macro panics if it is applied to a non-unsafe function: boot code
/// runs before the kernel invariants are established and must only be
/// called from the boot path.
///
/// # Safety
/// Functions with this attribute must only be called once, during boot.
#[proc_macro_attribute]
pub fn init(_: TokenStream, item: TokenStream) -> TokenStream {
    let mut input_fn = parse_macro_input!(item as ItemFn);
    let link_section = syn::parse_quote!(#[unsafe(link_section = ".text.init")]);

    if input_fn.sig.unsafety.is_none() {
        panic!("The `init` attribute can only be applied to unsafe functions");
    }

    input_fn.attrs.push(link_section);

    TokenStream::from(quote::quote!(
        #input_fn
    ))
}
