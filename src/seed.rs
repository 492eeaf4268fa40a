//! Startup provisioning of the synthetic decoy tree.
//!
//! Pure data seeding: a plausible server filesystem with just enough
//! bait (credentials files, department documents, logs) to keep a
//! visitor exploring. Directories are created if missing; seed files
//! are rewritten on every start, while anything an earlier visitor
//! created is left in place — the backing tree is the only persistence
//! the service has.

use std::path::Path;

use anyhow::Result;
use tokio::fs;
use tracing::info;

const DIRECTORIES: &[&str] = &[
    "bin",
    "boot",
    "dev",
    "etc",
    "home/admin/Documents/Projects",
    "home/admin/Documents/Reports",
    "home/admin/Documents/Personal",
    "home/admin/Downloads",
    "home/admin/Pictures",
    "home/admin/Work/Finance",
    "home/admin/Work/HR",
    "home/admin/Work/Engineering",
    "home/admin/Work/IT",
    "lib",
    "media",
    "mnt",
    "opt",
    "proc",
    "root",
    "run",
    "sbin",
    "srv",
    "sys",
    "tmp",
    "usr/local/bin",
    "usr/share/doc",
    "var/log",
    "var/www/html",
];

const FILES: &[(&str, &str)] = &[
    (
        "etc/passwd",
        "root:x:0:0:root:/root:/bin/bash\nadmin:x:1000:1000:admin,,,:/home/admin:/bin/bash\n",
    ),
    (
        "etc/shadow",
        "root:$6$saltsalt$hashedpassword:18030:0:99999:7:::\n\
         admin:$6$saltsalt$hashedpassword:18030:0:99999:7:::\n",
    ),
    ("etc/hosts", "127.0.0.1   localhost\n127.0.1.1   prod-web01\n"),
    (
        "etc/network.conf",
        "network_interface=eth0\nip_address=192.168.1.1\nnetmask=255.255.255.0\n\
         gateway=192.168.1.254\ndns1=8.8.8.8\ndns2=8.8.4.4\n",
    ),
    (
        "home/admin/readme.txt",
        "Welcome to the admin home directory!\n\
         This directory contains various documents and projects.\n",
    ),
    (
        "home/admin/Documents/project_plan.txt",
        "Project Plan:\n- Task 1: Research\n- Task 2: Development\n\
         - Task 3: Testing\n- Task 4: Deployment\n",
    ),
    (
        "home/admin/Documents/Projects/access_keys.txt",
        "Staging API key rotated 2024-06-01. Production key kept offline.\n",
    ),
    (
        "home/admin/Documents/Reports/annual_report.pdf",
        "%PDF-1.4\n%Annual report, internal distribution only.\n",
    ),
    (
        "home/admin/Documents/Personal/todo.txt",
        "TODO:\n- Renew VPN certificate\n- Finish migration runbook\n- Call vendor\n",
    ),
    (
        "home/admin/Downloads/data.csv",
        "id,name,value\n1,Alice,10\n2,Bob,20\n3,Charlie,30\n",
    ),
    (
        "home/admin/Work/Finance/payroll.csv",
        "EmployeeID,Name,Department,Salary\n1,John Doe,Engineering,50000\n\
         2,Jane Smith,Marketing,55000\n",
    ),
    (
        "home/admin/Work/HR/employee_handbook.txt",
        "Company employee handbook, revision 7.\n",
    ),
    (
        "home/admin/Work/Engineering/system_design.txt",
        "This document provides an overview of the platform architecture.\n",
    ),
    (
        "home/admin/Work/IT/network_config.txt",
        "Interface: eth0\nIP: 192.168.1.100\nNetmask: 255.255.255.0\nGateway: 192.168.1.1\n",
    ),
    (
        "var/log/syslog",
        "Jun 10 06:25:01 prod-web01 CRON[1298]: (root) CMD (cd / && run-parts --report /etc/cron.hourly)\n",
    ),
    (
        "var/log/auth.log",
        "Jun 10 06:25:01 prod-web01 sshd[1298]: Accepted password for admin from 192.168.1.100 port 22 ssh2\n",
    ),
    (
        "var/www/html/index.html",
        "<html><body><h1>It works!</h1></body></html>\n",
    ),
];

/// Creates the decoy tree under the sandbox root.
pub async fn provision(root: &Path) -> Result<()> {
    for dir in DIRECTORIES {
        fs::create_dir_all(root.join(dir)).await?;
    }
    for (path, content) in FILES {
        fs::write(root.join(path), content).await?;
    }
    info!(
        "Sandbox seeded at {} ({} directories, {} files)",
        root.display(),
        DIRECTORIES.len(),
        FILES.len()
    );
    Ok(())
}
