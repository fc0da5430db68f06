//! Locale codes, the language menu offered to users, and the UI strings
//! prewarmed on every language switch.

use std::borrow::Cow;

/// A language the UI can be switched to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language { code: "es", name: "Spanish (Español)" },
    Language { code: "fr", name: "French (Français)" },
    Language { code: "de", name: "German (Deutsch)" },
    Language { code: "it", name: "Italian (Italiano)" },
    Language { code: "pt", name: "Portuguese (Português)" },
    Language { code: "ja", name: "Japanese (日本語)" },
    Language { code: "ko", name: "Korean (한국어)" },
    Language { code: "zh-Hans", name: "Chinese Simplified (简体中文)" },
    Language { code: "zh-Hant", name: "Chinese Traditional (繁體中文)" },
    Language { code: "ru", name: "Russian (Русский)" },
    Language { code: "ar", name: "Arabic (العربية)" },
    Language { code: "hi", name: "Hindi (हिन्दी)" },
    Language { code: "nl", name: "Dutch (Nederlands)" },
    Language { code: "pl", name: "Polish (Polski)" },
    Language { code: "tr", name: "Turkish (Türkçe)" },
    Language { code: "sv", name: "Swedish (Svenska)" },
    Language { code: "no", name: "Norwegian (Norsk)" },
    Language { code: "da", name: "Danish (Dansk)" },
    Language { code: "fi", name: "Finnish (Suomi)" },
    Language { code: "el", name: "Greek (Ελληνικά)" },
    Language { code: "cs", name: "Czech (Čeština)" },
    Language { code: "ro", name: "Romanian (Română)" },
    Language { code: "hu", name: "Hungarian (Magyar)" },
    Language { code: "vi", name: "Vietnamese (Tiếng Việt)" },
    Language { code: "th", name: "Thai (ไทย)" },
    Language { code: "id", name: "Indonesian (Bahasa Indonesia)" },
    Language { code: "he", name: "Hebrew (עברית)" },
    Language { code: "uk", name: "Ukrainian (Українська)" },
    Language { code: "ca", name: "Catalan (Català)" },
    Language { code: "bg", name: "Bulgarian (Български)" },
    Language { code: "hr", name: "Croatian (Hrvatski)" },
    Language { code: "sk", name: "Slovak (Slovenčina)" },
    Language { code: "sl", name: "Slovenian (Slovenščina)" },
    Language { code: "lt", name: "Lithuanian (Lietuvių)" },
    Language { code: "lv", name: "Latvian (Latviešu)" },
    Language { code: "et", name: "Estonian (Eesti)" },
    Language { code: "ms", name: "Malay (Bahasa Melayu)" },
    Language { code: "tl", name: "Filipino (Filipino)" },
];

/// Look up a supported language by code (case-insensitive).
pub fn find_language(code: &str) -> Option<&'static Language> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|l| l.code.eq_ignore_ascii_case(code))
}

/// Minimal well-formedness check for a BCP 47 style code:
/// a 2-3 letter primary tag, then optional 2-8 character alphanumeric
/// subtags separated by `-` or `_` (`es`, `fil`, `zh-Hans`, `pt_BR`).
pub fn is_well_formed(code: &str) -> bool {
    let mut parts = code.split(['-', '_']);

    let primary_ok = parts
        .next()
        .is_some_and(|p| (2..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()));

    primary_ok && parts.all(|p| (2..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Canonical spelling of a locale code so that `ES`, `es` and ` es` key the
/// same cache entries. Catalog codes take their catalog spelling
/// (`zh-hans` becomes `zh-Hans`); other codes get a lowercase primary tag
/// and `-` separators.
pub fn normalize(code: &str) -> Cow<'_, str> {
    let code = code.trim();
    if let Some(language) = find_language(code) {
        return Cow::Borrowed(language.code);
    }

    let needs_rewrite = code.contains('_')
        || code
            .split('-')
            .next()
            .is_some_and(|p| p.chars().any(|c| c.is_ascii_uppercase()));
    if !needs_rewrite {
        return Cow::Borrowed(code);
    }

    let mut parts = code.split(['-', '_']);
    let mut out = parts.next().unwrap_or_default().to_ascii_lowercase();
    for part in parts {
        out.push('-');
        out.push_str(part);
    }
    Cow::Owned(out)
}

/// Labels every screen of the note application renders; prewarmed on a
/// language switch so the first render after the switch is already cached.
pub const COMMON_UI_STRINGS: &[&str] = &[
    // main actions
    "Create New Note", "View All Notes", "Help", "Quit",
    "Change UI Language", "Themes", "Statistics", "Notebooks",
    // navigation
    "Navigate Notes", "Open Selected", "Delete Note", "Search Notes",
    "Back to Home", "Save and Close", "Focus Mode", "Pin/Unpin",
    "Wiki Links", "Minimize Editor", "Quick Actions", "Note List",
    "Editor Mode",
    // status messages
    "Note saved successfully!", "Note pinned!", "Note unpinned",
    "Daily journal opened", "Focus Mode ON - Press Ctrl+F to exit",
    "Focus Mode OFF", "✓ Auto-saved",
    // prompts
    "Enter note name:", "Create New Notebook", "Editing",
    "Press Esc to go back", "Use [[Note Title]] to create links",
    // view titles
    "🎬 Quick Actions", "📋 Note List", "✏️  Editor Mode",
    "📝 Create New Note", "❓ Help & Documentation",
    // common words
    "Cancel", "Confirm", "Yes", "No", "Error", "Success",
    // home page
    "💡 WHAT IS TOTION?", "🎯 QUICK START GUIDE", "📝 CREATING NOTES",
    "✏️  EDITING & FORMATTING", "📊 VIEWING & ANALYZING", "💾 SYNC & BACKUP",
    "✨ WHY CHOOSE TOTION?",
    "Totion is a powerful terminal-based note-taking application that helps you:",
    "Get started in seconds:",
    "Capture ideas instantly without leaving your terminal workflow",
    "Organize notes with notebooks, tags, and wiki-style links",
    "Stay focused with distraction-free focus mode",
    "Track your productivity with built-in analytics",
    "Keep everything in sync with Git integration",
    "Create your first note", "View all your notes", "Open detailed help", "Quit application",
    "Create new note with custom name", "Daily journal (auto-dated)",
    "Quick scratch pad (temporary notes)", "Use pre-made templates (meetings, todos, etc.)",
    "Organize notes into notebooks", "Tag your notes for easy filtering",
    "Change UI language (English, Spanish, French, etc.)",
    "Save your work and close editor", "Enter focus mode (minimal distractions)",
    "Pin important notes to top", "Create [[wiki links]] to other notes",
    "Change color themes", "Search within notes",
    "Browse all notes in list view", "View statistics (note count, word count, trends)",
    "Full-text search across all notes", "Open help menu anytime",
    "Export notes (HTML, PDF, Markdown)", "Import from Notion, Markdown, etc.",
    "Git integration for version control", "Sync with cloud storage",
    "Lightning fast - No loading times, instant startup",
    "Privacy first - All data stored locally on your machine",
    "Works offline - No internet required",
    "Auto-save - Never lose your work",
    "Keyboard driven - Maximum productivity",
    "Markdown support - Beautiful formatting",
    "Cross-platform - Works on Linux, Mac, Windows",
    "TIP: Press Ctrl+H for complete documentation and tutorials",
    // scroll hints
    "📜 Use ↑↓ arrow keys or mouse scroll to navigate • Page Up/Down for faster scrolling",
    "📜 Use ↑↓ arrow keys or mouse scroll if content is not fully visible",
];
