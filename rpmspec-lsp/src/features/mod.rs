pub mod completion;
pub mod definition;
pub mod document_symbols;
pub mod hover;

#[cfg(test)]
pub(crate) mod test_support;
