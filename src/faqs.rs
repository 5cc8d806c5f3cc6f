// Copyright 2026 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// A canonical question/answer pair seeded into the index.
pub struct FaqSeed {
    pub question: &'static str,
    pub answer: &'static str,
    pub tags: &'static [&'static str],
}

/// Built-in technical FAQs covering account, payment and support flows.
pub fn technical_faqs() -> &'static [FaqSeed] {
    &[
        FaqSeed {
            question: "How do I reset my password?",
            answer: "You can reset your password from the login page by clicking 'Forgot Password', or directly from your profile settings.",
            tags: &["account", "password"],
        },
        FaqSeed {
            question: "I forgot my email or username, what can I do?",
            answer: "Please login to your account then access dashboard and find settings option and follow instructions from there.",
            tags: &["account", "login"],
        },
        FaqSeed {
            question: "I'm not receiving the verification email.",
            answer: "Check your spam folder, and make sure your email is correct in profile settings. If the issue continues, raise a ticket.",
            tags: &["account", "verification"],
        },
        FaqSeed {
            question: "My payment failed, what should I do?",
            answer: "If a payment fails, try again with a valid method. If still failing, contact support with your transaction ID.",
            tags: &["payment", "billing"],
        },
        FaqSeed {
            question: "Can I get a refund for a course?",
            answer: "Refunds are available within 7 days of purchase if less than 20% of the course is completed.",
            tags: &["payment", "refund"],
        },
        FaqSeed {
            question: "How do I enroll in a course?",
            answer: "Browse the course catalog, click 'Enroll', and complete payment if required.",
            tags: &["courses", "enrollment"],
        },
        FaqSeed {
            question: "How can I contact support?",
            answer: "You can raise a support ticket from your dashboard or visit the Help Center.",
            tags: &["support", "help"],
        },
    ]
}
