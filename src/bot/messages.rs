//! Bilingual (Khmer / English) reply templates.

use super::command::Command;
use crate::directory::{AddReport, RemoveReport};
use crate::queue::ticket::Ticket;

/// Gateway message length limit used when splitting long replies.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Templates parameterised by the business name.
#[derive(Debug, Clone)]
pub struct Templates {
    business: String,
}

impl Templates {
    pub fn new(business: impl Into<String>) -> Self {
        Self {
            business: business.into(),
        }
    }

    pub fn business(&self) -> &str {
        &self.business
    }

    pub fn staff_panel(&self) -> String {
        format!(
            "👨‍🔧 Admin Panel - {business}\n\n\
             ពាក្យបញ្ជាដែលអាចប្រើបាន:\n\
             /register - ចុះឈ្មោះអតិថិជនថ្មី\n\
             /ready - ជូនដំណឹងទៅអតិថិជនថារថយន្តរួចរាល់\n\
             /cancel - បោះបង់ប្រតិបត្តិការបច្ចុប្បន្ន\n\n\
             Available commands:\n\
             /register - Register a new customer\n\
             /ready - Notify customer their car is ready\n\
             /cancel - Cancel the current operation",
            business = self.business
        )
    }

    pub fn welcome(&self) -> String {
        format!(
            "🚗 សូមស្វាគមន៍មកកាន់ {business}!\n\n\
             សូមផ្ញើផ្លាកលេខរថយន្តរបស់អ្នក។\n\
             ឧទាហរណ៍៖ ABC-1234\n\n\
             🚗 Welcome to {business}!\n\n\
             Please send your vehicle plate number.\n\
             Example: ABC-1234",
            business = self.business
        )
    }

    pub fn help(&self, staff: bool) -> String {
        let rows = if staff {
            Command::staff_commands()
        } else {
            Command::customer_commands()
        };
        let mut text = if staff {
            format!("🛠 {} Bot Help 🛠\n\nAdmin commands:\n", self.business)
        } else {
            format!(
                "🚗 {} Customer Help 🚗\n\n\
                 To register for car wash notifications:\n\
                 1. Send /start\n\
                 2. Provide your vehicle plate number when asked\n\
                 3. You'll be notified when your car is ready\n\n\
                 ដើម្បីចុះឈ្មោះទទួលការជូនដំណឹង៖\n\
                 1. បញ្ជូនពាក្យបញ្ជា /start\n\
                 2. ផ្ញើផ្លាកលេខរថយន្តរបស់អ្នកនៅពេលស្នើសុំ\n\
                 3. អ្នកនឹងទទួលបានការជូនដំណឹងនៅពេលរថយន្តរបស់អ្នករួចរាល់\n\n\
                 Commands:\n",
                self.business
            )
        };
        for (syntax, description) in rows {
            text.push_str(&format!("{} - {}\n", syntax, description));
        }
        text
    }
}

pub fn unauthorized() -> String {
    "❌ អ្នកមិនមានសិទ្ធិប្រើបញ្ជានេះទេ។\n\
     ❌ You are not authorized to use this command."
        .to_string()
}

pub fn staff_plate_prompt() -> String {
    "✅ សូមផ្ញើផ្លាកលេខរថយន្តរបស់អតិថិជន\n\
     ✅ Please send the vehicle plate number\n\n\
     Type /cancel to abort."
        .to_string()
}

pub fn invalid_plate() -> String {
    "❌ ទម្រង់ផ្លាកលេខមិនត្រឹមត្រូវ។ សូមព្យាយាមម្តងទៀត។\n\
     ❌ Invalid plate format. Please try again.\n\n\
     Type /cancel to abort."
        .to_string()
}

pub fn duplicate_plate() -> String {
    "⚠️ ផ្លាកលេខនេះបានចុះឈ្មោះរួចហើយ។ សូមបញ្ចូលលេខផ្សេង។\n\
     ⚠️ This plate number is already registered. Please send a different one.\n\n\
     Type /cancel to abort."
        .to_string()
}

pub fn cancelled() -> String {
    "ប្រតិបត្តិការត្រូវបានបោះបង់។\nOperation cancelled.".to_string()
}

pub fn session_expired() -> String {
    "⌛ សំបុត្ររបស់អ្នកលែងមានទៀតហើយ។ សូមចុច /start ម្តងទៀត។\n\
     ⌛ Your ticket has expired. Please send /start again."
        .to_string()
}

pub fn unknown_command() -> String {
    "❓ មិនស្គាល់ពាក្យបញ្ជានេះទេ។ សូមប្រើ /help\n\
     ❓ Unknown command. Use /help"
        .to_string()
}

pub fn internal_error() -> String {
    "⚠️ មានបញ្ហាបច្ចេកទេស។ សូមព្យាយាមម្តងទៀត។\n\
     ⚠️ Something went wrong. Please try again."
        .to_string()
}

/// Confirmation sent to the customer once bound to a ticket.
pub fn customer_registered(ticket: &Ticket) -> String {
    let name = ticket.customer_name.as_deref().unwrap_or("-");
    format!(
        "ការចុះឈ្មោះអតិថិជនបានដោយជោគជ័យ!\n\n\
         🛂 លេខសំបុត្រ# : {qn}\n\
         🚗 ផ្លាកលេខ : {plate}\n\
         👤 ឈ្មោះអតិថិជន : {name}\n\n\
         អ្នកនឹងទទួលបានការជូនដំណឹងនៅពេលរថយន្តរបស់អ្នករួចរាល់។\n\n\
         Successful customer registration completed!\n\n\
         🛂 Ticket Number : {qn}\n\
         🚗 Plate : {plate}\n\
         👤 Customer Name : {name}\n\n\
         You'll be notified when your car is ready.",
        qn = ticket.queue_number,
        plate = ticket.plate_display(),
        name = name,
    )
}

/// Caption for the QR handed to staff after a staff registration.
pub fn staff_qr_caption(ticket: &Ticket, link: &str) -> String {
    format!(
        "បានចុះឈ្មោះអតិថិជនថ្មីរួចរាល់\n\n\
         🛂 លេខសំបុត្រ# : {qn}\n\
         🚗 ផ្លាកលេខ : {plate}\n\n\
         1. បង្ហាញកូដ QR នេះទៅអតិថិជន\n\
         2. អតិថិជនស្កែនវាតាមម៉ាស៊ីនថតទូរស័ព្ទ\n\
         3. ពួកគេនឹងត្រូវបានចុះឈ្មោះដោយស្វ័យប្រវត្តិ\n\
         ឬផ្ញើតំណផ្ទាល់នេះទៅពួកគេ:\n\
         {link}\n\n\
         New customer registration completed\n\n\
         🛂 Ticket Number : {qn}\n\
         🚗 Plate : {plate}\n\n\
         1. Show this QR code to the customer\n\
         2. They scan it with their phone camera\n\
         3. They'll be automatically registered\n\
         Or send them this direct link:\n\
         {link}",
        qn = ticket.queue_number,
        plate = ticket.plate_display(),
        link = link,
    )
}

pub fn staff_registered_notice(ticket: &Ticket, staff_name: &str) -> String {
    format!(
        "អតិថិជនថ្មីត្រូវបានចុះឈ្មោះដោយបុគ្គលិក\n\n\
         🛂 លេខសំបុត្រ# : {qn}\n\
         🚗 ផ្លាកលេខ : {plate}\n\
         👤 ឈ្មោះបុគ្គលិក : {staff}\n\
         ⏳ ស្ថានភាព៖ កំពុងរង់ចាំអតិថិជនបញ្ចូលតាម QR\n\n\
         A new customer has been registered by staff\n\n\
         🛂 Ticket Number : {qn}\n\
         🚗 Plate : {plate}\n\
         👤 Staff Name : {staff}\n\
         ⏳ Status : Waiting for customer to scan QR",
        qn = ticket.queue_number,
        plate = ticket.plate_display(),
        staff = staff_name,
    )
}

pub fn self_registered_notice(ticket: &Ticket) -> String {
    let name = ticket.customer_name.as_deref().unwrap_or("-");
    format!(
        "អតិថិជនបានចុះឈ្មោះដោយខ្លួនឯងដោយជោគជ័យ\n\n\
         🛂 លេខសំបុត្រ# : {qn}\n\
         🚗 ផ្លាកលេខ : {plate}\n\
         👤 ឈ្មោះអតិថិជន : {name}\n\
         ⏳ ស្ថានភាព៖ កំពុងរង់ចាំសេវាកម្ម\n\n\
         Customer has self-registered successfully\n\n\
         🛂 Ticket Number : {qn}\n\
         🚗 Plate : {plate}\n\
         👤 Customer Name : {name}\n\
         ⏳ Status : Waiting for service",
        qn = ticket.queue_number,
        plate = ticket.plate_display(),
        name = name,
    )
}

pub fn linked_notice(ticket: &Ticket) -> String {
    let name = ticket.customer_name.as_deref().unwrap_or("-");
    format!(
        "អតិថិជនបានចុះឈ្មោះតាមរយៈ QR Code ដោយជោគជ័យ\n\n\
         🛂 លេខសំបុត្រ# : {qn}\n\
         🚗 ផ្លាកលេខ : {plate}\n\
         👤 ឈ្មោះអតិថិជន : {name}\n\
         ⏳ ស្ថានភាព៖ កំពុងរង់ចាំសេវាកម្ម\n\n\
         Customer has successfully registered through QR Code\n\n\
         🛂 Ticket Number : {qn}\n\
         🚗 Plate : {plate}\n\
         👤 Customer Name : {name}\n\
         ⏳ Status : Waiting for service",
        qn = ticket.queue_number,
        plate = ticket.plate_display(),
        name = name,
    )
}

pub fn ready_customer(ticket: &Ticket, staff_name: &str) -> String {
    format!(
        "✨ ជំរាបសួរ! រថយន្តរបស់លោកអ្នកត្រូវបានលាងសំអាតរួចរាល់ហើយ។ ✨\n\n\
         🛂 លេខសំបុត្រ# : {qn}\n\
         🚗 ផ្លាកលេខ : {plate}\n\
         👤 ឈ្មោះបុគ្គលិក : {staff}\n\n\
         សូមអរគុណសម្រាប់ការរង់ចាំ និងការជឿទុកចិត្តលើសេវាកម្មរបស់យើងខ្ញុំ។ 🚗✨\n\n\
         ✨ Dear valued customer! Your car has been washed and is now ready. ✨\n\n\
         🛂 Ticket Number : {qn}\n\
         🚗 Plate : {plate}\n\
         👤 Staff Name : {staff}\n\n\
         Thank you for your patience and trust in our service.",
        qn = ticket.queue_number,
        plate = ticket.plate_display(),
        staff = staff_name,
    )
}

pub fn ready_staff(ticket: &Ticket, staff_name: &str) -> String {
    format!(
        "📢 បានជូនដំណឹងអតិថិជនដោយជោគជ័យ\n\n\
         🛂 លេខសំបុត្រ# : {qn}\n\
         🚗 ផ្លាកលេខ : {plate}\n\
         👤 ឈ្មោះបុគ្គលិក : {staff}\n\n\
         📢 Successfully notified customer\n\n\
         🛂 Ticket Number : {qn}\n\
         🚗 Plate : {plate}\n\
         👤 Staff Name : {staff}",
        qn = ticket.queue_number,
        plate = ticket.plate_display(),
        staff = staff_name,
    )
}

pub fn ready_group(ticket: &Ticket, staff_name: &str) -> String {
    format!(
        "ការលាងសំអាតរថយន្តអតិថិជនត្រូវបានបញ្ចប់ដោយជោគជ័យ។\n\n\
         🛂 លេខសំបុត្រ# : {qn}\n\
         🚗 ផ្លាកលេខ : {plate}\n\
         👤 ឈ្មោះបុគ្គលិក : {staff}\n\n\
         The customer's car wash has been successfully completed.\n\n\
         🛂 Ticket # : {qn}\n\
         🚗 Plate : {plate}\n\
         👤 Staff Name : {staff}",
        qn = ticket.queue_number,
        plate = ticket.plate_display(),
        staff = staff_name,
    )
}

pub fn ready_prompt() -> String {
    "📢 ជ្រើសរើសអតិថិជនដើម្បីជូនដំណឹង (លេខសំបុត្រ# - ផ្លាកលេខ):\n\
     📢 Select customer to notify (Ticket Number - Plate):"
        .to_string()
}

pub fn ready_choice_label(ticket: &Ticket) -> String {
    format!("{} ({})", ticket.queue_number, ticket.plate_display())
}

pub fn no_waiting_customers() -> String {
    "🚫 គ្មានអតិថិជនណាកំពុងរង់ចាំការជូនដំណឹងទេ។\n\
     🚫 No customers currently waiting for notification."
        .to_string()
}

pub fn already_ready(ticket: &Ticket) -> String {
    format!(
        "ℹ️ សំបុត្រ {qn} បានជូនដំណឹងរួចហើយ។\n\
         ℹ️ Ticket {qn} was already marked ready.",
        qn = ticket.queue_number
    )
}

pub fn customer_not_found() -> String {
    "❌ រកមិនឃើញអតិថិជនទេ\n❌ Could not find customer.".to_string()
}

pub fn ticket_status(ticket: &Ticket) -> String {
    let name = ticket.customer_name.as_deref().unwrap_or("-");
    let registered_at = ticket.created_at.format("%Y-%m-%d %H:%M:%S");
    format!(
        "👤 ឈ្មោះអតិថិជន: {name}\n\
         🛂 លេខសំបុត្រ: {qn}\n\
         🚗 ផ្លាកលេខ: {plate}\n\
         📊 ស្ថានភាព: {status_km}\n\
         🕒 ពេលវេលាចុះឈ្មោះ: {at}\n\n\
         🛂 Ticket Number: {qn}\n\
         🚗 Plate: {plate}\n\
         📊 Status: {status_en}\n\
         🕒 Registered at: {at} UTC",
        name = name,
        qn = ticket.queue_number,
        plate = ticket.plate_display(),
        status_km = ticket.status.label_km(),
        status_en = ticket.status.label_en(),
        at = registered_at,
    )
}

pub fn status_overview(tickets: &[Ticket], staff: bool) -> String {
    let mut text = if staff {
        "👑 Admin View - All Tickets 👑\n\n".to_string()
    } else {
        "🚗 Your Car Wash Tickets 🚗\n\n".to_string()
    };
    for ticket in tickets {
        text.push_str(&ticket_status(ticket));
        text.push_str("\n\n");
    }
    text
}

pub fn no_tickets() -> String {
    "ℹ️ No tickets found.\nℹ️ មិនមានសំបុត្រណាមួយទេ។".to_string()
}

pub fn ticket_not_found() -> String {
    "❌ Ticket number not found.\n❌ រកមិនឃើញលេខសំបុត្រនេះទេ។".to_string()
}

pub fn not_your_ticket() -> String {
    "❌ You are not authorized to view this ticket.\n❌ អ្នកមិនមានសិទ្ធិមើលសំបុត្រនេះទេ។"
        .to_string()
}

pub fn usage(syntax: &str) -> String {
    format!("Usage: {}", syntax)
}

fn join_ids<T: ToString>(ids: &[T]) -> String {
    ids.iter().map(T::to_string).collect::<Vec<_>>().join(", ")
}

/// Report for `/addadmin` and `/addgroups`. `noun` is e.g. "admins".
pub fn add_report(report: &AddReport, noun: &str) -> String {
    let mut lines = Vec::new();
    if !report.added.is_empty() {
        lines.push(format!("✅ Added {}: {}", noun, join_ids(&report.added)));
    }
    if !report.already_present.is_empty() {
        lines.push(format!(
            "ℹ️ Already present: {}",
            join_ids(&report.already_present)
        ));
    }
    if !report.invalid.is_empty() {
        lines.push(format!(
            "❌ Invalid IDs (must be numbers): {}",
            report.invalid.join(", ")
        ));
    }
    if lines.is_empty() {
        format!("No valid {} IDs provided.", noun)
    } else {
        lines.join("\n")
    }
}

pub fn remove_report(report: &RemoveReport, noun: &str) -> String {
    let mut lines = Vec::new();
    if !report.removed.is_empty() {
        lines.push(format!("✅ Removed {}: {}", noun, join_ids(&report.removed)));
    }
    if !report.not_present.is_empty() {
        lines.push(format!("⚠️ Not {}: {}", noun, join_ids(&report.not_present)));
    }
    if !report.invalid.is_empty() {
        lines.push(format!(
            "❌ Invalid IDs (must be numbers): {}",
            report.invalid.join(", ")
        ));
    }
    if lines.is_empty() {
        format!("No valid {} IDs provided.", noun)
    } else {
        lines.join("\n")
    }
}

pub fn last_admin() -> String {
    "⚠️ Cannot remove the last remaining admin.\n\
     ⚠️ មិនអាចលុបអ្នកគ្រប់គ្រងចុងក្រោយបានទេ។"
        .to_string()
}

pub fn id_list<T: ToString>(title: &str, ids: &[T], empty: &str) -> String {
    if ids.is_empty() {
        return empty.to_string();
    }
    let mut text = format!("{}:\n", title);
    for id in ids {
        text.push_str(&format!("- {}\n", id.to_string()));
    }
    text
}

pub fn moderation_warning(content: &str) -> String {
    format!(
        "⚠️ WARNING ⚠️\n\n\
         Prohibited {content} detected!\n\
         This bot does not allow:\n\
         - Games/Gambling content\n\
         - Crypto Scams\n\
         - Suspicious images\n\n\
         ការប្រកាសមាតិកាដែលមិនត្រូវបានអនុញ្ញាត៖\n\
         - ល្បែង/ភ្នាល់\n\
         - ការបោកប្រាស់គ្រីបតូ\n\
         - រូបភាពសង្ស័យ",
        content = content
    )
}

/// Split `text` into chunks of at most `limit` characters.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 || text.chars().count() <= limit {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
