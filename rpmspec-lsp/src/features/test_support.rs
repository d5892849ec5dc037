use std::path::PathBuf;
use std::sync::Arc;

use rpmspec_analysis::{
    FsMacroFileReader, LocalExpander, MacroDescriptor, MacroLevel, MacroResolver, MacroTable,
    NoPackages, ResolverSettings,
};

use crate::documents::DocumentEntry;
use crate::server::DefaultFeatureProvider;

pub(crate) const HELLO_SPEC: &str = "Name:       hello-world
Version:    1
Release:    1
Summary:    Most simple RPM package
License:    FIXME

%description
This is my first RPM package, which does nothing.

%global script hello-world.sh
%define dest %{_bindir}/%script
%prep
# we have no source, so nothing here

%build
cat > %script <<EOF
#!/usr/bin/bash
echo Hello world from package %{name}-%{version}
EOF

%install
mkdir -p %{buildroot}%{_bindir}
install -m 755 hello-world.sh %{buildroot}%{dest}

%undefined_macro

%files
/usr/bin/hello-world.sh

%changelog
# let's skip this for now
";

pub(crate) fn sample_entry() -> DocumentEntry {
    DocumentEntry::parse(Arc::new(HELLO_SPEC.to_string())).expect("failed to parse sample spec")
}

pub(crate) fn sample_session() -> Arc<MacroTable> {
    Arc::new(MacroTable::from_descriptors([
        MacroDescriptor::new("_prefix", MacroLevel::MacroFile, "/usr"),
        MacroDescriptor::new("_exec_prefix", MacroLevel::MacroFile, "%{_prefix}"),
        MacroDescriptor::new("_bindir", MacroLevel::MacroFile, "%{_exec_prefix}/bin"),
        MacroDescriptor::new("dirname", MacroLevel::Builtin, "<builtin>"),
    ]))
}

pub(crate) fn sample_resolver() -> MacroResolver {
    MacroResolver::new(
        sample_session(),
        NoPackages,
        FsMacroFileReader,
        ResolverSettings {
            macro_dir: PathBuf::from("/nonexistent/macros.d"),
            builtin_macro_file: PathBuf::from("/nonexistent/macros"),
        },
    )
}

pub(crate) fn sample_provider() -> DefaultFeatureProvider {
    DefaultFeatureProvider::new(sample_resolver(), LocalExpander::new(sample_session()))
}
