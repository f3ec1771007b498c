fn main() -> anyhow::Result<()> {
    version_gen::gen_version("ARCADE_VERSION", env!("CARGO_MANIFEST_DIR"))
}
