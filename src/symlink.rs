use crate::device::Device;

pub const UDEVADM: &str = "udevadm";

/// Alias namespaces that udev derives from other names
const DERIVED_PREFIXES: [&str; 2] = ["/dev/disk", "/dev/mapper"];

/// First udev symlink of a device that is not a by-id/by-path/mapper
/// alias, in the order udev reports them.
pub fn first_external(device: &Device) -> Option<String> {
    let kernel_path = format!("--path=/block/{}", device.short_name());
    let out = device
        .context()
        .execute(&[UDEVADM, "info", "--root", "--query=symlink", kernel_path.as_str()]);
    select_external(out.split_whitespace()).map(str::to_string)
}

pub fn select_external<'a>(links: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    links.into_iter().find(|link| {
        link.starts_with("/dev/") && !DERIVED_PREFIXES.iter().any(|prefix| link.starts_with(prefix))
    })
}
