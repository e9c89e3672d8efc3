/// Bundles the plugin with nih_plug_xtask:
///
///   cargo xtask bundle sharc-echo --release
///
/// The bundles end up in `target/bundled/`.
fn main() -> nih_plug_xtask::Result<()> {
    nih_plug_xtask::main()
}
