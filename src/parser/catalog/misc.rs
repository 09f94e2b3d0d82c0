//! Device state: dylibs, URLs, keychain, location, media, permissions and
//! contacts.

use super::{BUNDLE_ID, NUMBER};
use crate::parser::types::CommandDefinition;

pub fn definitions() -> Vec<CommandDefinition> {
    let location = format!(
        r"^(?:set|simulate|change|establecer|cambiar)\s+(?:the\s+|la\s+)?(?:gps\s+)?(?:location|ubicaci[oó]n)\s+(?:to\s+|a\s+|en\s+)?\(?\s*(?P<latitude>{NUMBER})\s*,\s*(?P<longitude>{NUMBER})\s*\)?$"
    );
    let permissions = format!(
        r"^(?:approve|grant|allow|aprobar|conceder)\s+(?:the\s+|los\s+)?(?:permissions?|permisos?)\s+(?P<permissions>[\w\s,]+?)\s+(?:for|to|para|a)\s+(?:app\s+)?(?P<bundleId>{BUNDLE_ID})$"
    );

    vec![
        CommandDefinition::new("install dylib", "Install a dynamic library into the simulator")
            .patterns(&[
                r"^(?:install|inject|load|instalar)\s+(?:the\s+)?dylib\s+(?:from\s+|desde\s+)?(?P<dylibPath>\S+)$",
            ])
            .required(&["dylibPath"])
            .examples(&["install dylib /tmp/libInspector.dylib"])
            .capture("dylibPath"),
        CommandDefinition::new("open url", "Open a URL or deep link")
            .patterns(&[
                r"^(?:open|visit|go\s+to|navigate\s+to|abrir|abre|ir\s+a)\s+(?:the\s+|la\s+)?(?:url\s+|link\s+|enlace\s+)?(?P<url>[a-z][a-z0-9+.-]*://\S+)$",
            ])
            .required(&["url"])
            .examples(&["open url https://example.com", "go to myapp://settings/profile", "abrir enlace https://example.com"])
            .capture("url"),
        CommandDefinition::new("clear keychain", "Clear the simulator keychain")
            .patterns(&[r"^(?:clear|reset|wipe|limpiar|borrar)\s+(?:the\s+|el\s+)?(?:keychain|llavero)$"])
            .examples(&["clear keychain", "reset the keychain", "limpiar llavero"]),
        CommandDefinition::new("set location", "Set the simulated GPS location")
            .patterns(&[location.as_str()])
            .required(&["latitude", "longitude"])
            .examples(&["set location to 40.4168, -3.7038", "establecer ubicación en 10.76, 106.66"])
            .capture_number("latitude")
            .capture_number("longitude"),
        CommandDefinition::new("add media", "Add photos or videos to the camera roll")
            .patterns(&[
                r"^(?:add|upload|import|a[nñ]adir|agregar)\s+(?:the\s+)?(?:media|photos?|videos?|images?|fotos?)\s+(?:from\s+|desde\s+)?(?P<mediaPaths>.+)$",
            ])
            .required(&["mediaPaths"])
            .examples(&["add media /tmp/a.png /tmp/b.mov", "add photos /tmp/cat.jpg, /tmp/dog.jpg"])
            .capture_list("mediaPaths"),
        CommandDefinition::new("approve permissions", "Grant app permissions (photos, camera, contacts, url, location, notification, microphone)")
            .patterns(&[permissions.as_str()])
            .required(&["bundleId", "permissions"])
            .examples(&[
                "approve permissions photos, camera for com.example.demo",
                "grant permission location to com.example.demo",
            ])
            .capture("bundleId")
            .capture_list("permissions"),
        CommandDefinition::new("update contacts", "Replace the contacts database with a sqlite file")
            .patterns(&[
                r"^(?:update|replace|load|actualizar)\s+(?:the\s+|los\s+)?(?:contacts|contactos)\s+(?:from\s+|with\s+|desde\s+|con\s+)?(?P<dbPath>\S+)$",
            ])
            .required(&["dbPath"])
            .examples(&["update contacts from /tmp/contacts.sqlite"])
            .capture("dbPath"),
    ]
}
